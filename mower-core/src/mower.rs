use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    model::{MowerCommand, MowerRef},
};

pub mod husqvarna;

pub use husqvarna::HusqvarnaClient;

/// Vendor API that can list mowers and send them commands.
#[async_trait]
pub trait MowerApi: Send + Sync + Debug {
    async fn list_mowers(&self) -> Result<Vec<MowerRef>>;

    async fn send_command(&self, mower_id: &str, command: MowerCommand) -> Result<()>;
}
