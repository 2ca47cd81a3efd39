use snafu::Snafu;

use crate::message::PlaceholderId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("placeholder {active} is still pending on `{stage}`"))]
    PendingAlreadyExists {
        stage: &'static str,
        active: PlaceholderId,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
