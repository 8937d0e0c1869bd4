pub mod convert;
pub mod invoice;
pub mod settle;
