//! Messages of the `google.longrunning.Operations` service.

use prost::{Message, Name};
use serde::{Deserialize, Serialize};

use crate::pager::{PagedRequest, PagedResponse};
use crate::wkt::{Any, Duration, Status, TYPE_URL_PREFIX};

const PACKAGE: &str = "google.longrunning";

macro_rules! longrunning_name {
    ($ty:ident) => {
        impl Name for $ty {
            const NAME: &'static str = stringify!($ty);
            const PACKAGE: &'static str = PACKAGE;

            fn type_url() -> String {
                format!("{TYPE_URL_PREFIX}{}", Self::full_name())
            }
        }
    };
}

/// Server-side record of a long-running operation.
///
/// At most one of `error` and `response` is set, and only once `done`.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Any>,
    #[prost(bool, tag = "3")]
    pub done: bool,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Any>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetOperationRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOperationsRequest {
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(string, tag = "1")]
    pub filter: String,
    #[prost(int32, tag = "2")]
    #[serde(alias = "page_size")]
    pub page_size: i32,
    #[prost(string, tag = "3")]
    #[serde(alias = "page_token")]
    pub page_token: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOperationsResponse {
    #[prost(message, repeated, tag = "1")]
    pub operations: Vec<Operation>,
    #[prost(string, tag = "2")]
    #[serde(alias = "next_page_token")]
    pub next_page_token: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CancelOperationRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteOperationRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// Server-side wait; `timeout` is a JSON duration such as `"30s"`.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitOperationRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

longrunning_name!(Operation);
longrunning_name!(GetOperationRequest);
longrunning_name!(ListOperationsRequest);
longrunning_name!(ListOperationsResponse);
longrunning_name!(CancelOperationRequest);
longrunning_name!(DeleteOperationRequest);
longrunning_name!(WaitOperationRequest);

impl PagedRequest for ListOperationsRequest {
    fn page_token(&self) -> &str {
        &self.page_token
    }

    fn set_page_token(&mut self, token: String) {
        self.page_token = token;
    }
}

impl PagedResponse for ListOperationsResponse {
    type Item = Operation;

    fn next_page_token(&self) -> &str {
        &self.next_page_token
    }

    fn items(&self) -> &[Operation] {
        &self.operations
    }
}
