//! Built-in classes: `SmallInt`, `String`, and `Closure`.
//!
//! The built-ins are ordinary registered classes whose methods are native
//! functions honouring the method calling convention, so dispatch treats
//! them exactly like user code that happens to have been born compiled.

use crate::class::{register_class, Class, Method};
use crate::object::Str;
use mysore_core::{selector, Selector, Value};
use std::io::Write;
use std::mem::transmute;
use std::sync::LazyLock;

/// The class of tagged small integers. Has no instance variables; integer
/// receivers are never heap objects.
pub fn small_int_class() -> &'static Class {
    static CLASS: LazyLock<&'static Class> = LazyLock::new(|| {
        register_class(Class {
            name: "SmallInt".into(),
            superclass: None,
            methods: vec![Method::new(
                selector::intern("dump"),
                0,
                small_int_dump,
                std::ptr::null(),
            )],
            ivar_names: Vec::new(),
        })
    });
    *CLASS
}

/// The class of string objects.
pub fn string_class() -> &'static Class {
    static CLASS: LazyLock<&'static Class> = LazyLock::new(|| {
        register_class(Class {
            name: "String".into(),
            superclass: None,
            methods: vec![
                Method::new(selector::intern("length"), 0, string_length, std::ptr::null()),
                Method::new(
                    selector::intern("charAt"),
                    1,
                    unsafe {
                        transmute::<unsafe extern "C" fn(Value, Selector, Value) -> Value, _>(
                            string_char_at,
                        )
                    },
                    std::ptr::null(),
                ),
                Method::new(selector::intern("dump"), 0, string_dump, std::ptr::null()),
            ],
            ivar_names: Vec::new(),
        })
    });
    *CLASS
}

/// The class of closure objects. Responds to no methods; closures are
/// invoked through their `invoke` slot, not through dispatch.
pub fn closure_class() -> &'static Class {
    static CLASS: LazyLock<&'static Class> = LazyLock::new(|| {
        register_class(Class {
            name: "Closure".into(),
            superclass: None,
            methods: Vec::new(),
            ivar_names: Vec::new(),
        })
    });
    *CLASS
}

unsafe extern "C" fn small_int_dump(this: Value, _cmd: Selector) -> Value {
    println!("{}", this.as_int());
    this
}

unsafe extern "C" fn string_length(this: Value, _cmd: Selector) -> Value {
    unsafe { (*this.as_obj_ptr::<Str>()).length }
}

unsafe extern "C" fn string_char_at(this: Value, _cmd: Selector, index: Value) -> Value {
    let bytes = unsafe { Str::bytes(this.as_obj_ptr::<Str>()) };
    match bytes.get(index.as_int() as usize) {
        Some(&byte) => Value::from_int(i64::from(byte)),
        None => Value::NULL,
    }
}

unsafe extern "C" fn string_dump(this: Value, _cmd: Selector) -> Value {
    let bytes = unsafe { Str::bytes(this.as_obj_ptr::<Str>()) };
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(bytes);
    let _ = stdout.flush();
    this
}
