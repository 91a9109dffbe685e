use std::fmt::Debug;

use model::WithId;
use utility::id::{HasId, Id};

pub mod company;
pub mod session;
pub mod stop_event;
pub mod user;
pub mod vehicle;
pub mod weekly;

pub trait DatabaseRow {
    type Model: HasId;

    fn get_id(&self) -> Id<Self::Model>;
    fn to_model(self) -> Self::Model;
}

pub fn with_ids<R: DatabaseRow>(rows: Vec<R>) -> Vec<WithId<R::Model>>
where
    <R::Model as HasId>::IdType: Debug + Clone,
{
    rows.into_iter().map(|row| with_id(row)).collect::<Vec<_>>()
}

pub fn with_id<R: DatabaseRow>(row: R) -> WithId<R::Model>
where
    <R::Model as HasId>::IdType: Debug + Clone,
{
    WithId::new(row.get_id(), row.to_model())
}
