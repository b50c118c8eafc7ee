use chrono::{DateTime, Utc};

use super::{DataError, Dataset};
use crate::ids::{ContractId, ThreadId};
use crate::threads::domain::{EducationThread, NewEducationThread, ThreadContractAssignment};

impl Dataset {
    pub fn threads(&self) -> impl Iterator<Item = &EducationThread> {
        self.threads.values()
    }

    pub fn thread(&self, id: ThreadId) -> Result<&EducationThread, DataError> {
        self.threads
            .get(&id)
            .ok_or_else(|| DataError::not_found("education thread", id.0))
    }

    pub fn insert_thread(
        &mut self,
        new: NewEducationThread,
        now: DateTime<Utc>,
    ) -> Result<EducationThread, DataError> {
        new.validate()?;
        self.content(new.author_content)?;

        let article = new.article.trim().to_string();
        if self.threads.values().any(|thread| thread.article == article) {
            return Err(DataError::Duplicate {
                entity: "education thread",
                field: "article",
                value: article,
            });
        }

        let thread = EducationThread {
            id: ThreadId(self.next_id()),
            article,
            author_content: new.author_content,
            start_date: new.start_date,
            end_date: new.end_date,
            is_open_start: new.is_open_start,
            is_open_end: new.is_open_end,
            is_auto_generated: new.is_auto_generated,
            schedule: new.schedule,
            created_at: now,
        };
        self.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    /// Delete a thread and its contract assignments.
    pub fn delete_thread(&mut self, id: ThreadId) -> Result<EducationThread, DataError> {
        let removed = self
            .threads
            .remove(&id)
            .ok_or_else(|| DataError::not_found("education thread", id.0))?;
        self.thread_assignments
            .retain(|assignment| assignment.thread != id);
        Ok(removed)
    }

    pub fn assignments_for_thread(
        &self,
        thread: ThreadId,
    ) -> impl Iterator<Item = &ThreadContractAssignment> {
        self.thread_assignments
            .iter()
            .filter(move |assignment| assignment.thread == thread)
    }

    pub fn assignments_for_contract(
        &self,
        contract: ContractId,
    ) -> impl Iterator<Item = &ThreadContractAssignment> {
        self.thread_assignments
            .iter()
            .filter(move |assignment| assignment.contract == contract)
    }

    pub fn contract_count(&self, thread: ThreadId) -> usize {
        self.assignments_for_thread(thread).count()
    }

    pub fn assign_contract(
        &mut self,
        thread: ThreadId,
        contract: ContractId,
        now: DateTime<Utc>,
    ) -> Result<ThreadContractAssignment, DataError> {
        let article = self.thread(thread)?.article.clone();
        let number = self.contract(contract)?.contract_number.clone();

        if self
            .assignments_for_thread(thread)
            .any(|assignment| assignment.contract == contract)
        {
            return Err(DataError::Duplicate {
                entity: "thread assignment",
                field: "contract",
                value: format!("{article}/{number}"),
            });
        }

        let assignment = ThreadContractAssignment {
            thread,
            contract,
            created_at: now,
        };
        self.thread_assignments.push(assignment.clone());
        Ok(assignment)
    }

    pub fn unassign_contract(
        &mut self,
        thread: ThreadId,
        contract: ContractId,
    ) -> Result<ThreadContractAssignment, DataError> {
        let position = self
            .thread_assignments
            .iter()
            .position(|assignment| assignment.thread == thread && assignment.contract == contract)
            .ok_or_else(|| DataError::not_found("thread assignment", contract.0))?;
        Ok(self.thread_assignments.remove(position))
    }
}
