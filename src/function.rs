use core::fmt;
use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;

use crate::error::{Error, Result};
use crate::types::{ReturnSlot, TypeKey, Value};

/// Erased call: resolved arguments in, one entry per return slot out.
/// Error slots hold `None`.
pub type ErasedCall = dyn Fn(Vec<Value>) -> anyhow::Result<Vec<Option<Value>>> + Send + Sync;

/// A callable with its declared parameter and return types.
///
/// Built from any plain Rust function or closure through [`Injectable`], or by hand
/// with [`Function::dynamic`].
pub struct Function {
    signature: &'static str,
    parameters: Vec<TypeKey>,
    returns: Vec<ReturnSlot>,
    call: Box<ErasedCall>,
}

impl Function {
    pub fn new<F, Args, M>(func: F) -> Self
    where
        F: Injectable<Args, M>,
    {
        func.into_function()
    }

    /// Describe a callable by hand.
    ///
    /// `call` receives one value per entry of `parameters`, in order, and must return
    /// one entry per entry of `returns`.
    pub fn dynamic<C>(
        signature: &'static str,
        parameters: Vec<TypeKey>,
        returns: Vec<ReturnSlot>,
        call: C,
    ) -> Self
    where
        C: Fn(Vec<Value>) -> anyhow::Result<Vec<Option<Value>>> + Send + Sync + 'static,
    {
        Self {
            signature,
            parameters,
            returns,
            call: Box::new(call),
        }
    }

    pub fn signature(&self) -> &'static str {
        self.signature
    }

    pub fn parameters(&self) -> &[TypeKey] {
        &self.parameters
    }

    pub fn returns(&self) -> &[ReturnSlot] {
        &self.returns
    }

    /// Call with already resolved arguments.
    ///
    /// Every argument must be of its declared parameter type, and every returned
    /// value of its declared slot type, or the call fails with
    /// [`Error::TypeMismatch`]. An error in any error slot aborts with
    /// [`Error::Invocation`] and the other returned values are dropped.
    pub fn call(&self, args: Vec<Value>) -> Result<Vec<Option<Value>>> {
        for (index, key) in self.parameters.iter().enumerate() {
            match args.get(index) {
                Some(arg) if Any::type_id(&**arg) == key.id() => {}
                _ => return Err(Error::TypeMismatch { key: *key }),
            }
        }

        let returned = (self.call)(args).map_err(Error::Invocation)?;
        if returned.len() != self.returns.len() {
            return Err(Error::ReturnMismatch {
                signature: self.signature,
                expected: self.returns.len(),
                actual: returned.len(),
            });
        }

        let declared = self.returns.iter().filter(|slot| slot.key().is_some()).count();
        let present = self
            .returns
            .iter()
            .zip(&returned)
            .filter(|(slot, value)| slot.key().is_some() && value.is_some())
            .count();
        if present != declared {
            return Err(Error::ReturnMismatch {
                signature: self.signature,
                expected: declared,
                actual: present,
            });
        }
        for (slot, value) in self.returns.iter().zip(&returned) {
            if let (Some(key), Some(value)) = (slot.key(), value) {
                if Any::type_id(&**value) != key.id() {
                    return Err(Error::TypeMismatch { key });
                }
            }
        }
        Ok(returned)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("signature", &format_args!("{}", self.signature))
            .field("parameters", &self.parameters)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Return shape markers, inferred by the compiler.
pub mod shape {
    use super::PhantomData;

    pub struct Single;
    pub struct Several;
    pub struct Fallible<M>(PhantomData<M>);
}

/// Types a provider function may return.
///
/// * any `Clone + Send + Sync` value is one slot, except `()` which is none;
/// * [`Multi`] is one slot per tuple element;
/// * `anyhow::Result<R>` is the slots of `R` followed by an error slot.
pub trait Returns<M>: Sized + 'static {
    fn slots() -> Vec<ReturnSlot>;
    fn into_values(self) -> anyhow::Result<Vec<Option<Value>>>;
}

impl<T> Returns<shape::Single> for T
where
    T: Clone + Send + Sync + 'static,
{
    fn slots() -> Vec<ReturnSlot> {
        let key = TypeKey::of::<T>();
        if key.is_unit() {
            Vec::new()
        } else {
            vec![ReturnSlot::Value(key)]
        }
    }

    fn into_values(self) -> anyhow::Result<Vec<Option<Value>>> {
        if TypeKey::of::<T>().is_unit() {
            return Ok(Vec::new());
        }
        Ok(vec![Some(Arc::new(self) as Value)])
    }
}

impl<R, M> Returns<shape::Fallible<M>> for anyhow::Result<R>
where
    R: Returns<M>,
{
    fn slots() -> Vec<ReturnSlot> {
        let mut slots = R::slots();
        slots.push(ReturnSlot::Error);
        slots
    }

    fn into_values(self) -> anyhow::Result<Vec<Option<Value>>> {
        let mut values = self?.into_values()?;
        values.push(None);
        Ok(values)
    }
}

/// Several return values, each provided as its own type. `()` elements provide
/// nothing.
///
/// ```
/// use lazydi::{Container, Multi};
///
/// let container = Container::new();
/// container.provide(|| Multi((8080u16, String::from("localhost")))).unwrap();
/// container.invoke(|port: u16, host: String| {
///     assert_eq!(format!("{host}:{port}"), "localhost:8080");
/// }).unwrap();
/// ```
pub struct Multi<T>(pub T);

macro_rules! impl_multi {
    ($($T:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($T),+> Returns<shape::Several> for Multi<($($T,)+)>
        where
            $($T: Clone + Send + Sync + 'static,)+
        {
            fn slots() -> Vec<ReturnSlot> {
                [$(TypeKey::of::<$T>()),+]
                    .into_iter()
                    .filter(|key| !key.is_unit())
                    .map(ReturnSlot::Value)
                    .collect()
            }

            fn into_values(self) -> anyhow::Result<Vec<Option<Value>>> {
                let Multi(($($T,)+)) = self;
                let mut values = Vec::new();
                $(
                    if !TypeKey::of::<$T>().is_unit() {
                        values.push(Some(Arc::new($T) as Value));
                    }
                )+
                Ok(values)
            }
        }
    };
}

impl_multi!(A);
impl_multi!(A, B);
impl_multi!(A, B, C);
impl_multi!(A, B, C, D);
impl_multi!(A, B, C, D, E);
impl_multi!(A, B, C, D, E, F);
impl_multi!(A, B, C, D, E, F, G);
impl_multi!(A, B, C, D, E, F, G, H);

/// A function whose parameters can be resolved from a container.
///
/// Implemented for every `Fn` of up to twelve parameters whose parameter types are
/// `Clone + Send + Sync + 'static` and whose return type implements [`Returns`].
pub trait Injectable<Args, M>: Send + Sync + Sized + 'static {
    fn into_function(self) -> Function;
}

fn take_argument<T>(args: &mut impl Iterator<Item = (usize, Value)>) -> anyhow::Result<T>
where
    T: Clone + 'static,
{
    let (index, value) = args
        .next()
        .ok_or_else(|| anyhow!("missing argument of type '{}'", type_name::<T>()))?;
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| anyhow!("argument[{index}] is not of type '{}'", type_name::<T>()))
}

macro_rules! impl_injectable {
    ($($P:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<Func, Ret, M, $($P),*> Injectable<($($P,)*), M> for Func
        where
            Func: Fn($($P),*) -> Ret + Send + Sync + 'static,
            Ret: Returns<M>,
            $($P: Clone + Send + Sync + 'static,)*
        {
            fn into_function(self) -> Function {
                let call = move |args: Vec<Value>| -> anyhow::Result<Vec<Option<Value>>> {
                    let mut args = args.into_iter().enumerate();
                    $(let $P = take_argument::<$P>(&mut args)?;)*
                    (self)($($P),*).into_values()
                };
                Function::dynamic(
                    type_name::<fn($($P),*) -> Ret>(),
                    vec![$(TypeKey::of::<$P>()),*],
                    Ret::slots(),
                    call,
                )
            }
        }
    };
}

impl_injectable!();
impl_injectable!(A);
impl_injectable!(A, B);
impl_injectable!(A, B, C);
impl_injectable!(A, B, C, D);
impl_injectable!(A, B, C, D, E);
impl_injectable!(A, B, C, D, E, F);
impl_injectable!(A, B, C, D, E, F, G);
impl_injectable!(A, B, C, D, E, F, G, H);
impl_injectable!(A, B, C, D, E, F, G, H, I);
impl_injectable!(A, B, C, D, E, F, G, H, I, J);
impl_injectable!(A, B, C, D, E, F, G, H, I, J, K);
impl_injectable!(A, B, C, D, E, F, G, H, I, J, K, L);

#[cfg(test)]
mod tests {
    use super::*;

    fn greet(name: String, times: usize) -> String {
        name.repeat(times)
    }

    #[test]
    fn describes_parameters_and_returns() {
        let function = Function::new(greet);

        assert_eq!(
            function.parameters(),
            &[TypeKey::of::<String>(), TypeKey::of::<usize>()]
        );
        assert_eq!(function.returns(), &[ReturnSlot::Value(TypeKey::of::<String>())]);
        assert!(function.signature().starts_with("fn("));
    }

    #[test]
    fn unit_return_has_no_slots() {
        let function = Function::new(|_: u8| {});
        assert!(function.returns().is_empty());
        assert!(function.call(vec![Arc::new(1u8) as Value]).unwrap().is_empty());
    }

    #[test]
    fn fallible_return_appends_error_slot() {
        let function = Function::new(|| -> anyhow::Result<Multi<(u8, u16)>> { Ok(Multi((1, 2))) });
        assert_eq!(
            function.returns(),
            &[
                ReturnSlot::Value(TypeKey::of::<u8>()),
                ReturnSlot::Value(TypeKey::of::<u16>()),
                ReturnSlot::Error,
            ]
        );

        let values = function.call(Vec::new()).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[1].as_ref().unwrap().downcast_ref::<u16>(), Some(&2));
        assert!(values[2].is_none());
    }

    #[test]
    fn unit_elements_of_multi_are_skipped() {
        let function = Function::new(|| Multi(((), 1u8, ())));
        assert_eq!(function.returns(), &[ReturnSlot::Value(TypeKey::of::<u8>())]);

        let values = function.call(Vec::new()).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].as_ref().unwrap().downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn wrong_argument_type_is_a_type_mismatch() {
        let function = Function::new(|n: u8| n);
        match function.call(vec![Arc::new(String::from("eight")) as Value]) {
            Err(Error::TypeMismatch { key }) => assert_eq!(key, TypeKey::of::<u8>()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            function.call(Vec::new()),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn wrong_return_type_is_a_type_mismatch() {
        let function = Function::dynamic(
            "liar() -> u8",
            Vec::new(),
            vec![ReturnSlot::Value(TypeKey::of::<u8>())],
            |_| Ok(vec![Some(Arc::new(1u64) as Value)]),
        );
        assert!(matches!(
            function.call(Vec::new()),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn error_value_aborts_call() {
        let function = Function::new(|| -> anyhow::Result<u8> { Err(anyhow!("nope")) });
        match function.call(Vec::new()) {
            Err(Error::Invocation(err)) => assert_eq!(err.to_string(), "nope"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn dynamic_return_count_is_checked() {
        let function = Function::dynamic(
            "dynamic",
            Vec::new(),
            vec![ReturnSlot::Value(TypeKey::of::<u8>())],
            |_| Ok(Vec::new()),
        );
        assert!(matches!(
            function.call(Vec::new()),
            Err(Error::ReturnMismatch { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn function_has_useful_debug_impl() {
        let function = Function::new(|x: i32| x + 1);
        let debug = format!("{:?}", function);
        assert!(debug.starts_with("Function { signature: fn(i32) -> i32"));
    }
}
