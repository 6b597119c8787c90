//! Classes, methods, and the process-wide class table.
//!
//! A class is immutable after registration, with one exception: tier-up
//! replaces a method's entry point in place. Classes are leaked on
//! registration and live for the rest of the process; everything that holds
//! a `&'static Class` can rely on that.

use crate::builtins::small_int_class;
use crate::call::{CompiledMethod, MAX_ARITY};
use crate::object::Object;
use mysore_core::{Selector, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::LazyLock;

/// Type-erased pointer to the AST node a method or closure was declared
/// from. Null for native methods. Only the interpreter crate gives this a
/// concrete type.
pub type AstRef = *const ();

/// One entry in a class's method table.
pub struct Method {
    /// The interned method name.
    pub selector: Selector,
    /// Declared argument count, at most [`MAX_ARITY`].
    pub args: u32,
    /// The entry point. Starts as an arity-matched interpreter trampoline
    /// (or a native function for built-ins); tier-up swaps in compiled code.
    function: AtomicPtr<()>,
    /// The declaring AST node, or null for native methods.
    pub ast: AstRef,
}

// Safety: the AST pointer is immutable shared data owned by the driver for
// the life of the process, and execution is single-threaded; the pointer is
// only ever dereferenced on the interpreter thread.
unsafe impl Send for Method {}
unsafe impl Sync for Method {}

impl Method {
    /// Create a method-table entry.
    ///
    /// Panics if `args` exceeds [`MAX_ARITY`]; declarations that wide are
    /// rejected before a class is built.
    pub fn new(selector: Selector, args: u32, function: CompiledMethod, ast: AstRef) -> Self {
        assert!(
            args as usize <= MAX_ARITY,
            "method declared with {args} arguments; the limit is {MAX_ARITY}"
        );
        Self {
            selector,
            args,
            function: AtomicPtr::new(function as *mut ()),
            ast,
        }
    }

    /// The current entry point.
    #[inline]
    pub fn function(&self) -> CompiledMethod {
        let raw = self.function.load(Ordering::Relaxed);
        unsafe { std::mem::transmute::<*mut (), CompiledMethod>(raw) }
    }

    /// Replace the entry point. Used exactly once per method, at tier-up.
    pub fn set_function(&self, function: CompiledMethod) {
        self.function.store(function as *mut (), Ordering::Relaxed);
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("selector", &self.selector)
            .field("args", &self.args)
            .finish()
    }
}

/// A MysoreScript class.
#[derive(Debug)]
pub struct Class {
    /// The class name.
    pub name: String,
    /// The superclass, if any. Instance layout is flat per class; only
    /// method lookup walks this chain.
    pub superclass: Option<&'static Class>,
    /// The method table, searched linearly.
    pub methods: Vec<Method>,
    /// Instance-variable names, in slot order.
    pub ivar_names: Vec<String>,
}

impl Class {
    /// Number of instance-variable slots in an instance of this class.
    #[inline]
    pub fn ivar_count(&self) -> usize {
        self.ivar_names.len()
    }

    /// Find a method by walking the class chain from this class upward.
    ///
    /// Returns the first match; a subclass entry shadows its superclass.
    pub fn method_for_selector(&self, sel: Selector) -> Option<&Method> {
        let mut cls = Some(self);
        while let Some(c) = cls {
            if let Some(m) = c.methods.iter().find(|m| m.selector == sel) {
                return Some(m);
            }
            cls = c.superclass;
        }
        None
    }
}

/// The process-wide class table.
static CLASSES: LazyLock<RwLock<FxHashMap<String, &'static Class>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// Register a class, leaking it into the class table.
///
/// Re-registering a name replaces the table entry (REPL redefinition);
/// instances of the old class keep their old class pointer.
pub fn register_class(class: Class) -> &'static Class {
    let leaked: &'static Class = Box::leak(Box::new(class));
    CLASSES.write().insert(leaked.name.clone(), leaked);
    leaked
}

/// Look up a class by name.
#[must_use]
pub fn lookup_class(name: &str) -> Option<&'static Class> {
    CLASSES.read().get(name).copied()
}

/// The class a value dispatches through: `SmallInt` for tagged integers,
/// otherwise the class in the object header.
///
/// # Safety
///
/// If `value` is a non-null object pointer it must point at a live heap
/// object with a valid class header.
pub unsafe fn receiver_class(value: Value) -> &'static Class {
    if value.is_int() {
        small_int_class()
    } else {
        unsafe { &*(*value.as_obj_ptr::<Object>()).isa }
    }
}

/// Resolve the entry point a call site should invoke for `value` and `sel`.
///
/// # Safety
///
/// Same requirements as [`receiver_class`].
pub unsafe fn compiled_method_for_selector(value: Value, sel: Selector) -> Option<CompiledMethod> {
    let cls = unsafe { receiver_class(value) };
    cls.method_for_selector(sel).map(Method::function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysore_core::selector;

    unsafe extern "C" fn stub_a(_this: Value, _cmd: Selector) -> Value {
        Value::from_int(1)
    }

    unsafe extern "C" fn stub_b(_this: Value, _cmd: Selector) -> Value {
        Value::from_int(2)
    }

    fn class_with_method(name: &str, method: &str, f: CompiledMethod) -> Class {
        Class {
            name: name.into(),
            superclass: None,
            methods: vec![Method::new(selector::intern(method), 0, f, std::ptr::null())],
            ivar_names: Vec::new(),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let cls = register_class(class_with_method("RegLookup", "m", stub_a));
        let found = lookup_class("RegLookup").unwrap();
        assert!(std::ptr::eq(cls, found));
        assert!(lookup_class("NoSuchClass").is_none());
    }

    #[test]
    fn test_reregistration_replaces_entry() {
        let first = register_class(class_with_method("ReRegistered", "m", stub_a));
        let second = register_class(class_with_method("ReRegistered", "m", stub_b));
        let found = lookup_class("ReRegistered").unwrap();
        assert!(std::ptr::eq(second, found));
        assert!(!std::ptr::eq(first, found));
    }

    #[test]
    fn test_method_lookup_walks_superclass_chain() {
        let base = register_class(class_with_method("LookupBase", "inherited", stub_a));
        let sub = register_class(Class {
            name: "LookupSub".into(),
            superclass: Some(base),
            methods: vec![Method::new(
                selector::intern("own"),
                0,
                stub_b,
                std::ptr::null(),
            )],
            ivar_names: Vec::new(),
        });

        let own = sub.method_for_selector(selector::intern("own")).unwrap();
        assert_eq!(own.function() as usize, stub_b as usize);

        let inherited = sub
            .method_for_selector(selector::intern("inherited"))
            .unwrap();
        assert_eq!(inherited.function() as usize, stub_a as usize);

        assert!(sub.method_for_selector(selector::intern("missing")).is_none());
    }

    #[test]
    fn test_subclass_shadows_superclass() {
        let base = register_class(class_with_method("ShadowBase", "m", stub_a));
        let sub = register_class(Class {
            name: "ShadowSub".into(),
            superclass: Some(base),
            methods: vec![Method::new(selector::intern("m"), 0, stub_b, std::ptr::null())],
            ivar_names: Vec::new(),
        });
        let m = sub.method_for_selector(selector::intern("m")).unwrap();
        assert_eq!(m.function() as usize, stub_b as usize);
    }

    #[test]
    fn test_set_function_replaces_exactly_one_entry() {
        let cls = register_class(Class {
            name: "TierUpTarget".into(),
            superclass: None,
            methods: vec![
                Method::new(selector::intern("hot"), 0, stub_a, std::ptr::null()),
                Method::new(selector::intern("cold"), 0, stub_a, std::ptr::null()),
            ],
            ivar_names: Vec::new(),
        });

        let hot = cls.method_for_selector(selector::intern("hot")).unwrap();
        hot.set_function(stub_b);

        assert_eq!(
            cls.method_for_selector(selector::intern("hot")).unwrap().function() as usize,
            stub_b as usize
        );
        assert_eq!(
            cls.method_for_selector(selector::intern("cold")).unwrap().function() as usize,
            stub_a as usize
        );
    }

    #[test]
    fn test_receiver_class_for_integers() {
        let cls = unsafe { receiver_class(Value::from_int(5)) };
        assert_eq!(cls.name, "SmallInt");
    }

    #[test]
    #[should_panic(expected = "limit")]
    fn test_method_arity_limit() {
        let _ = Method::new(selector::intern("wide"), 11, stub_a, std::ptr::null());
    }
}
