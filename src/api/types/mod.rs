//! Request and response types of the admin API

mod error;
mod json;
mod response;

pub use error::{ApiError, StatusMessage};
pub use json::{Json, JsonRejection};
pub use response::{KeyListResponse, ModifyResponse, OrgListResponse};
