//! Every backend operation is a plain request value; services answer
//! them through one of these two traits, so the HTTP resources and the CLI
//! drive the same code.
use anyhow::Result;

pub trait Request {
    type Resp;
}

/// Read-only operations.
pub trait Queryable<Req>
where
    Req: Request,
{
    fn query(&self, req: Req) -> Result<Req::Resp>;
}

/// Operations that write.
pub trait Commandable<Req>
where
    Req: Request,
{
    fn execute(&self, req: Req) -> Result<Req::Resp>;
}
