use chrono::{DateTime, Utc};
use tracing::info;

use super::{DataverseService, ServiceError};
use crate::ids::{ContractId, ThreadId};
use crate::store::DatasetRepository;
use crate::threads::{EducationThread, NewEducationThread, ThreadContractAssignment, ThreadFilter};
use crate::views::ThreadView;

impl<R> DataverseService<R>
where
    R: DatasetRepository + 'static,
{
    pub fn create_thread(&self, new: NewEducationThread) -> Result<ThreadView, ServiceError> {
        let now = self.now();
        let view = self.write(|data| {
            let thread = data.insert_thread(new, now)?;
            Ok(ThreadView::build(&thread, data, now.date_naive()))
        })?;
        info!(
            thread = %view.id,
            article = %view.article,
            status = view.status_label,
            "education thread created"
        );
        Ok(view)
    }

    pub fn thread(&self, id: ThreadId, at: Option<DateTime<Utc>>) -> Result<ThreadView, ServiceError> {
        let today = self.instant(at).date_naive();
        Ok(self.read(|data| {
            data.thread(id)
                .map(|thread| ThreadView::build(thread, data, today))
        })??)
    }

    pub fn threads(
        &self,
        filter: &ThreadFilter,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<ThreadView>, ServiceError> {
        let now = self.instant(at);
        self.read(|data| {
            filter
                .apply(data, now)
                .into_iter()
                .map(|thread| ThreadView::build(thread, data, now.date_naive()))
                .collect()
        })
    }

    pub fn delete_thread(&self, id: ThreadId) -> Result<EducationThread, ServiceError> {
        let removed = self.write(|data| data.delete_thread(id))?;
        info!(thread = %id, article = %removed.article, "education thread deleted");
        Ok(removed)
    }

    pub fn assign_contract(
        &self,
        thread: ThreadId,
        contract: ContractId,
    ) -> Result<ThreadContractAssignment, ServiceError> {
        let now = self.now();
        let assignment = self.write(|data| data.assign_contract(thread, contract, now))?;
        info!(%thread, %contract, "contract assigned to thread");
        Ok(assignment)
    }

    pub fn unassign_contract(
        &self,
        thread: ThreadId,
        contract: ContractId,
    ) -> Result<ThreadContractAssignment, ServiceError> {
        let assignment = self.write(|data| data.unassign_contract(thread, contract))?;
        info!(%thread, %contract, "contract removed from thread");
        Ok(assignment)
    }
}
