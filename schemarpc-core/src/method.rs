//! Method table: typed handlers keyed by message name and parameter types.
//!
//! Handlers are plain functions taking the service by reference followed by
//! one argument per message parameter:
//!
//! ```ignore
//! impl Calculator {
//!     fn add(&self, a: i32, b: i32) -> Result<i32, CalcError> { Ok(a + b) }
//! }
//!
//! methods.register("add", Calculator::add)?;
//! ```
//!
//! The parameter-type vector is derived from the argument types through
//! [`NativeType`], so a handler is found exactly when the resolved schema
//! types of a message match its Rust signature.

use crate::error::{DispatchError, HandlerFault};
use crate::native::{ConversionError, FromValue, IntoValue, NativeType, NativeTypeId};
use schemarpc_protocol::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Method name plus ordered parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub name: String,
    pub param_types: Vec<NativeTypeId>,
}

impl Signature {
    pub fn new(name: impl Into<String>, param_types: Vec<NativeTypeId>) -> Self {
        Self {
            name: name.into(),
            param_types,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, ty) in self.param_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}

/// Failure while invoking a type-erased method.
#[derive(Debug)]
pub enum InvokeError {
    /// Argument `index` could not be converted to the handler's type.
    Argument {
        index: usize,
        reason: ConversionError,
    },
    /// The handler itself returned an error.
    Fault(HandlerFault),
}

/// A type-erased handler bound to service type `S`.
pub type Method<S> = Arc<dyn Fn(&S, Vec<Value>) -> Result<Value, InvokeError> + Send + Sync>;

/// A function usable as a handler for service `S` with argument tuple `Args`.
pub trait Handler<S, Args>: Send + Sync + Sized + 'static {
    /// Identifiers of the handler's parameter types, in order.
    fn param_types() -> Vec<NativeTypeId>;

    fn into_method(self) -> Method<S>;
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<S, F, R, E, $($arg,)*> Handler<S, ($($arg,)*)> for F
        where
            S: 'static,
            F: Fn(&S, $($arg),*) -> Result<R, E> + Send + Sync + 'static,
            R: IntoValue + 'static,
            E: Into<HandlerFault> + 'static,
            $($arg: FromValue + NativeType + 'static,)*
        {
            fn param_types() -> Vec<NativeTypeId> {
                vec![$(<$arg as NativeType>::native_type()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_method(self) -> Method<S> {
                Arc::new(move |service: &S, args: Vec<Value>| {
                    let expected = <[&str]>::len(&[$(stringify!($arg)),*]);
                    let actual = args.len();
                    if actual != expected {
                        return Err(InvokeError::Argument {
                            index: actual.min(expected),
                            reason: ConversionError::Arity { expected, actual },
                        });
                    }

                    let mut args = args.into_iter().enumerate();
                    $(
                        let $arg = match args.next() {
                            Some((index, value)) => <$arg as FromValue>::from_value(value)
                                .map_err(|reason| InvokeError::Argument { index, reason })?,
                            None => {
                                return Err(InvokeError::Argument {
                                    index: actual,
                                    reason: ConversionError::Arity { expected, actual },
                                })
                            }
                        };
                    )*

                    (self)(service, $($arg),*)
                        .map(IntoValue::into_value)
                        .map_err(|e| InvokeError::Fault(e.into()))
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);

/// Encodes a declared fault type as a datum.
struct FaultEncoder {
    type_id: NativeTypeId,
    encode: Box<dyn Fn(&(dyn StdError + 'static)) -> Option<Value> + Send + Sync>,
}

/// Registered handlers for a service, keyed by [`Signature`].
pub struct MethodTable<S> {
    methods: HashMap<Signature, Method<S>>,
    faults: Vec<FaultEncoder>,
}

impl<S: 'static> MethodTable<S> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            faults: Vec::new(),
        }
    }

    /// Registers `handler` under `name`. The parameter types come from the
    /// handler's argument types. Overloads with different parameter types
    /// may share a name.
    pub fn register<H, Args>(&mut self, name: &str, handler: H) -> Result<&mut Self, DispatchError>
    where
        H: Handler<S, Args>,
    {
        let signature = Signature::new(name, H::param_types());
        if self.methods.contains_key(&signature) {
            return Err(DispatchError::DuplicateMethod(signature));
        }

        debug!(%signature, "registered method");
        self.methods.insert(signature, handler.into_method());
        Ok(self)
    }

    /// Declares that handlers may fail with `E`, which is then encoded as a
    /// datum instead of its display string when a message declares it.
    pub fn declare_fault<E>(&mut self) -> &mut Self
    where
        E: StdError + Clone + IntoValue + NativeType + Send + Sync + 'static,
    {
        self.faults.push(FaultEncoder {
            type_id: E::native_type(),
            encode: Box::new(|fault: &(dyn StdError + 'static)| {
                fault.downcast_ref::<E>().map(|e| e.clone().into_value())
            }),
        });
        self
    }

    /// Encodes a fault through the first declared fault type it matches.
    pub fn encode_fault(&self, fault: &(dyn StdError + 'static)) -> Option<(&NativeTypeId, Value)> {
        self.faults
            .iter()
            .find_map(|f| (f.encode)(fault).map(|value| (&f.type_id, value)))
    }

    pub fn lookup(&self, signature: &Signature) -> Option<&Method<S>> {
        self.methods.get(signature)
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.methods.contains_key(signature)
    }

    /// Returns the registered signatures, sorted by name then parameter types.
    pub fn signatures(&self) -> Vec<&Signature> {
        let mut signatures: Vec<&Signature> = self.methods.keys().collect();
        signatures.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.param_types.cmp(&b.param_types))
        });
        signatures
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<S: 'static> Default for MethodTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
