use crate::store::{data::RunStatus, db::mem::DbDocument};

impl DbDocument for RunStatus {
    fn id(&self) -> String {
        self.run_id.clone()
    }
}
