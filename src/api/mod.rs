pub mod extract;
pub mod response;

pub use extract::{customer_id_param, order_id_param, ApiJson};
pub use response::{ApiMessage, ApiResponse, ApiResult, Existence};
