//! Where sequences come from.

use std::future::Future;
use std::pin::Pin;

use cyrano_providers::ScriptServer;
use cyrano_types::{GroupId, InstructionId};
use serde_json::Value;

pub use cyrano_providers::FetchError;

pub type SourceFut<'a> = Pin<Box<dyn Future<Output = Result<Vec<Value>, FetchError>> + Send + 'a>>;

/// Sequence fetch collaborator.
///
/// Implementations return raw record arrays; the engine decodes them. "No
/// result" is an empty array.
pub trait SequenceSource: Send + Sync {
    fn fetch_group(&self, group: GroupId) -> SourceFut<'_>;

    fn fetch_containing(&self, instruction: InstructionId) -> SourceFut<'_>;

    fn fetch_catalog(&self) -> SourceFut<'_>;
}

impl SequenceSource for ScriptServer {
    fn fetch_group(&self, group: GroupId) -> SourceFut<'_> {
        Box::pin(ScriptServer::fetch_group(self, group))
    }

    fn fetch_containing(&self, instruction: InstructionId) -> SourceFut<'_> {
        Box::pin(ScriptServer::fetch_containing(self, instruction))
    }

    fn fetch_catalog(&self) -> SourceFut<'_> {
        Box::pin(ScriptServer::fetch_catalog(self))
    }
}
