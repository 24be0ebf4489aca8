use crate::store::{data::ActionExecution, db::mem::DbDocument};

impl DbDocument for ActionExecution {
    fn id(&self) -> String {
        self.id.clone()
    }
}
