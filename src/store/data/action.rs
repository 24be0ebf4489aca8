use serde::{Deserialize, Serialize};

use crate::{
    common::Params,
    model::ActionType,
    store::{DbCollectionIden, StoreIden},
};

/// One executed action as recorded in the action log.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ActionExecution {
    pub id: String,
    pub run_id: String,
    pub device_id: String,

    pub command: String,
    pub params: Params,
    pub channel: ActionType,
    pub success: bool,
    pub iterations: u32,
    pub execution_time_ms: u64,
    pub message: Option<String>,
    pub timestamp: i64,
}

impl DbCollectionIden for ActionExecution {
    fn iden() -> StoreIden {
        StoreIden::Actions
    }
}
