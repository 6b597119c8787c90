//! The interpreter context: global storage, the local symbol-table stack,
//! and the return register.
//!
//! A symbol table maps a name to a *slot address*. Global slots are small
//! holders allocated as uncollectable GC roots, appended and never moved,
//! so their addresses stay valid for the life of the context. Local slots
//! are addresses into a caller's argument array, into a closure's captured
//! slots, or into the receiver's instance variables; they are only valid
//! while the call that bound them is on the stack, which is exactly as long
//! as their map stays pushed.

use crate::backend::Backend;
use mysore_core::Value;
use mysore_runtime::gc;
use rustc_hash::FxHashMap;
use std::mem::size_of;
use std::ptr::NonNull;

/// A symbol table: name to slot address.
///
/// Keys borrow from the leaked AST (and the leaked class table), which
/// outlive every context.
pub type SymbolTable = FxHashMap<&'static str, *mut Value>;

/// A single global variable's storage, allocated as an uncollectable root
/// so the collector keeps anything it references alive.
struct GlobalSlot {
    ptr: NonNull<Value>,
}

impl GlobalSlot {
    fn new(value: Value) -> Self {
        let ptr = gc::alloc_uncollectable(size_of::<Value>()).cast::<Value>();
        unsafe { ptr.as_ptr().write(value) };
        Self { ptr }
    }

    fn address(&self) -> *mut Value {
        self.ptr.as_ptr()
    }
}

impl Drop for GlobalSlot {
    fn drop(&mut self) {
        unsafe { gc::free_uncollectable(self.ptr.cast()) };
    }
}

/// The interpreter context.
pub struct Context {
    /// Global slot holders, append-only.
    globals: Vec<GlobalSlot>,
    /// Name to slot address for every global.
    global_symbols: SymbolTable,
    /// The local symbol-table stack, one map per active user-defined call.
    symbols: Vec<SymbolTable>,
    /// The value carried by an executed `return` statement.
    pub ret_val: Value,
    /// Set while unwinding to the nearest enclosing user-defined call;
    /// every statement list stops executing when it observes this.
    pub is_returning: bool,
    /// The tier-up backend, if one is installed.
    backend: Option<Box<dyn Backend>>,
}

impl Context {
    /// Create a context with tier-up disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            globals: Vec::new(),
            global_symbols: SymbolTable::default(),
            symbols: Vec::new(),
            ret_val: Value::NULL,
            is_returning: false,
            backend: None,
        }
    }

    /// Create a context that tiers up through `backend`.
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::new()
        }
    }

    /// The installed backend, if any.
    pub fn backend(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    /// Resolve a name to a slot address: the top local map first (inner
    /// scopes never need walking — captured variables were copied into the
    /// closure when it was created), then the globals.
    pub fn lookup_symbol(&self, name: &str) -> Option<*mut Value> {
        if let Some(top) = self.symbols.last() {
            if let Some(&slot) = top.get(name) {
                return Some(slot);
            }
        }
        self.global_symbols.get(name).copied()
    }

    /// Store `value` into the slot `name` resolves to, allocating a fresh
    /// global slot when it resolves to nothing.
    ///
    /// The fallback is what makes a `var` at global scope allocate storage;
    /// it also means assigning an unknown name inside a function silently
    /// creates a global.
    pub fn set_symbol(&mut self, name: &'static str, value: Value) {
        match self.lookup_symbol(name) {
            Some(slot) => unsafe { *slot = value },
            None => {
                let slot = GlobalSlot::new(value);
                self.global_symbols.insert(name, slot.address());
                self.globals.push(slot);
            }
        }
    }

    /// Bind `name` directly to a slot address in the top local map. Used
    /// during call setup to alias parameters, captured variables, `self`,
    /// `cmd` and instance variables to their backing storage.
    pub fn bind_slot(&mut self, name: &'static str, slot: *mut Value) {
        match self.symbols.last_mut() {
            Some(top) => {
                top.insert(name, slot);
            }
            None => unreachable!("bind_slot outside a call frame"),
        }
    }

    /// Push a fresh local symbol map for a call.
    pub fn push_symbols(&mut self) {
        self.symbols.push(SymbolTable::default());
    }

    /// Pop the local symbol map on call exit. The popped slots reference
    /// the caller's stack frame, so this must happen before the frame dies.
    pub fn pop_symbols(&mut self) {
        self.symbols.pop();
    }

    /// Current depth of the local symbol stack.
    #[must_use]
    pub fn local_depth(&self) -> usize {
        self.symbols.len()
    }

    /// Read the return register, clearing it and the returning flag so a
    /// function that never executes `return` yields null.
    pub fn take_return(&mut self) -> Value {
        let value = self.ret_val;
        self.ret_val = Value::NULL;
        self.is_returning = false;
        value
    }

    /// The global symbol map, as handed to the backend at tier-up.
    #[must_use]
    pub fn global_symbols(&self) -> &SymbolTable {
        &self.global_symbols
    }

    /// Read a global variable's current value.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<Value> {
        self.global_symbols.get(name).map(|&slot| unsafe { *slot })
    }

    /// Discard interpreter state left behind by an aborted batch so the
    /// context can keep serving a REPL. Globals survive.
    pub fn reset_after_abort(&mut self) {
        self.symbols.clear();
        self.ret_val = Value::NULL;
        self.is_returning = false;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_symbol_creates_global() {
        let mut ctx = Context::new();
        assert!(ctx.lookup_symbol("x").is_none());
        ctx.set_symbol("x", Value::from_int(3));
        assert_eq!(ctx.global("x").map(Value::as_int), Some(3));
    }

    #[test]
    fn test_set_symbol_updates_existing_global() {
        let mut ctx = Context::new();
        ctx.set_symbol("x", Value::from_int(1));
        let first = ctx.lookup_symbol("x").unwrap();
        ctx.set_symbol("x", Value::from_int(2));
        let second = ctx.lookup_symbol("x").unwrap();
        assert_eq!(first, second, "global slot must not move");
        assert_eq!(ctx.global("x").map(Value::as_int), Some(2));
    }

    #[test]
    fn test_local_binding_shadows_global() {
        let mut ctx = Context::new();
        ctx.set_symbol("x", Value::from_int(1));

        let mut local = Value::from_int(42);
        ctx.push_symbols();
        ctx.bind_slot("x", &mut local);
        let slot = ctx.lookup_symbol("x").unwrap();
        assert_eq!(unsafe { *slot }.as_int(), 42);
        ctx.pop_symbols();

        let slot = ctx.lookup_symbol("x").unwrap();
        assert_eq!(unsafe { *slot }.as_int(), 1);
    }

    #[test]
    fn test_only_top_local_map_is_searched() {
        let mut ctx = Context::new();
        let mut outer = Value::from_int(1);
        ctx.push_symbols();
        ctx.bind_slot("y", &mut outer);
        ctx.push_symbols();
        // The inner frame does not inherit the outer binding.
        assert!(ctx.lookup_symbol("y").is_none());
        ctx.pop_symbols();
        assert!(ctx.lookup_symbol("y").is_some());
        ctx.pop_symbols();
    }

    #[test]
    fn test_take_return_clears_state() {
        let mut ctx = Context::new();
        ctx.ret_val = Value::from_int(9);
        ctx.is_returning = true;
        assert_eq!(ctx.take_return().as_int(), 9);
        assert!(ctx.ret_val.is_null());
        assert!(!ctx.is_returning);
        assert!(ctx.take_return().is_null());
    }

    #[test]
    fn test_reset_after_abort() {
        let mut ctx = Context::new();
        ctx.set_symbol("kept", Value::from_int(5));
        ctx.push_symbols();
        ctx.is_returning = true;
        ctx.reset_after_abort();
        assert_eq!(ctx.local_depth(), 0);
        assert!(!ctx.is_returning);
        assert_eq!(ctx.global("kept").map(Value::as_int), Some(5));
    }
}
