use crate::error::ProjectionError;
use crate::projection::Projection;
use crate::value::Value;

/// Custom behavior for operations of a contract.
///
/// Registered per `(projection contract, declaring contract)` pair on the
/// [`ProjectorBuilder`](crate::ProjectorBuilder). The calling projection is
/// passed as `me` so the extension can call back into it.
pub trait Mixin: Send + Sync {
    fn invoke(&self, me: &Projection, operation: &str, args: &[Value]) -> Result<Value, ProjectionError>;
}

impl<F> Mixin for F
where
    F: Fn(&Projection, &str, &[Value]) -> Result<Value, ProjectionError> + Send + Sync,
{
    fn invoke(&self, me: &Projection, operation: &str, args: &[Value]) -> Result<Value, ProjectionError> {
        self(me, operation, args)
    }
}
