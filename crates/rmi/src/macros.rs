/// Declares a remote interface.
///
/// Expands to:
///
/// - the trait itself, with `Send + Sync + 'static` as supertraits;
/// - `impl RemoteInterface for dyn Trait`: the descriptor and one
///   dispatch entry per method;
/// - `impl Trait for Stub<dyn Trait>`: every method becomes a network call.
///
/// Every method takes `&self` and returns `Result<T, E>` where `T` is
/// serializable and `E` implements [`RemoteError`](crate::RemoteError).
///
/// # Example
///
/// ```no_run
/// use rmi::{remote_interface, RmiError, Skeleton, Stub};
/// use std::sync::Arc;
///
/// remote_interface! {
///     pub trait Pingpong {
///         fn ping(&self, id: i32) -> Result<String, RmiError>;
///     }
/// }
///
/// struct Table;
///
/// impl Pingpong for Table {
///     fn ping(&self, id: i32) -> Result<String, RmiError> {
///         Ok(format!("Pong {}", id))
///     }
/// }
///
/// let skeleton = Skeleton::<dyn Pingpong>::bind(Arc::new(Table), "127.0.0.1:7000".parse().unwrap()).unwrap();
/// skeleton.start().unwrap();
///
/// let stub = Stub::<dyn Pingpong>::for_skeleton(&skeleton).unwrap();
/// assert_eq!(stub.ping(7).unwrap(), "Pong 7");
/// skeleton.stop();
/// ```
#[macro_export]
macro_rules! remote_interface {
    (
        $(#[$attr:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_attr:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) -> Result<$ret:ty, $err:ty>;
            )*
        }
    ) => {
        $(#[$attr])*
        $vis trait $name: ::std::marker::Send + ::std::marker::Sync + 'static {
            $(
                $(#[$method_attr])*
                fn $method(&self $(, $arg: $arg_ty)*) -> ::std::result::Result<$ret, $err>;
            )*
        }

        impl $crate::RemoteInterface for dyn $name {
            fn descriptor() -> $crate::protocol::InterfaceDescriptor {
                $crate::protocol::InterfaceDescriptor::interface(stringify!($name))
                $(
                    .operation($crate::protocol::OperationDescriptor::new(
                        stringify!($method),
                        ::std::vec![$($crate::protocol::TypeDescriptor::of(stringify!($arg_ty))),*],
                        $crate::protocol::TypeDescriptor::of(stringify!($ret)),
                        <$err as $crate::RemoteError>::failure_kinds(),
                    ))
                )*
            }

            fn operations() -> ::std::vec::Vec<$crate::Operation<Self>> {
                ::std::vec![
                    $(
                        $crate::Operation::<Self>::new(
                            stringify!($method),
                            ::std::vec![$($crate::protocol::TypeDescriptor::of(stringify!($arg_ty))),*],
                            |target: &Self, values: ::std::vec::Vec<$crate::protocol::RpcValue>| {
                                #[allow(unused_mut)]
                                let mut args = $crate::protocol::Arguments::new(stringify!($method), values);
                                $(
                                    let $arg: $arg_ty = args.next()?;
                                )*
                                args.finish()?;
                                $crate::interface::complete(target.$method($($arg),*))
                            },
                        )
                    ),*
                ]
            }
        }

        impl $name for $crate::Stub<dyn $name> {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) -> ::std::result::Result<$ret, $err> {
                    self.call(
                        stringify!($method),
                        ::std::vec![$($crate::protocol::TypeDescriptor::of(stringify!($arg_ty))),*],
                        ::std::vec![$($crate::protocol::to_argument(&$arg)),*],
                    )
                }
            )*
        }
    };
}
