//! Action tracker
//!
//! Durable JSON-lines journal (`transactions.jsonl`). One writer, one
//! entry per line; per-transaction sequence numbers strictly increase.
//! Rollback marks are appended as their own entries so the log stays
//! append-only; current state is rebuilt by replay on open.

use crate::intent::Step;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Journal errors
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal entry malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),
}

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Running,
    Completed,
    Failed,
    RolledBack,
}

/// One completed mutating action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub transaction_id: String,
    pub sequence: u64,
    pub tool: String,
    pub action: String,
    pub args: HashMap<String, Value>,
    /// Declarative inverse, present only for invertible actions
    pub inverse_hint: Option<Step>,
    pub completed_at: DateTime<Utc>,
    /// Derived from rollback entries during replay
    #[serde(default, skip_serializing)]
    pub rolled_back: bool,
}

/// Transaction summary for history listings
#[derive(Debug, Clone)]
pub struct TransactionSummary {
    pub id: String,
    pub user_input: String,
    pub goal: String,
    pub status: TransactionStatus,
    pub opened_at: DateTime<Utc>,
    pub action_count: usize,
}

/// One line of the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum JournalEntry {
    TxnOpened {
        transaction_id: String,
        user_input: String,
        goal: String,
        opened_at: DateTime<Utc>,
    },
    Action(ActionRecord),
    TxnClosed {
        transaction_id: String,
        status: TransactionStatus,
        closed_at: DateTime<Utc>,
    },
    RolledBack {
        transaction_id: String,
        sequence: u64,
        at: DateTime<Utc>,
    },
}

#[derive(Debug)]
struct Inner {
    file: File,
    /// Next sequence per open (or seen) transaction
    sequences: HashMap<String, u64>,
}

/// Append-only action journal
///
/// All writes go through one mutex so appends are serialized; the lock
/// is never held across tool or LLM calls.
#[derive(Debug)]
pub struct ActionTracker {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl ActionTracker {
    /// Open (or create) the journal at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().append(true).create(true).open(&path)?;

        // Recover per-transaction sequence counters from existing entries
        let mut sequences = HashMap::new();
        for entry in read_entries(&path)? {
            if let JournalEntry::Action(record) = entry {
                let next = sequences.entry(record.transaction_id.clone()).or_insert(0);
                *next = (*next).max(record.sequence + 1);
            }
        }

        Ok(Self {
            path,
            inner: Mutex::new(Inner { file, sequences }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a transaction; returns its id
    pub fn begin(&self, user_input: &str, goal: &str) -> Result<String, JournalError> {
        let transaction_id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().unwrap();
        inner.sequences.insert(transaction_id.clone(), 0);
        append(
            &mut inner.file,
            &JournalEntry::TxnOpened {
                transaction_id: transaction_id.clone(),
                user_input: user_input.to_string(),
                goal: goal.to_string(),
                opened_at: Utc::now(),
            },
        )?;
        Ok(transaction_id)
    }

    /// Record a completed mutating step; returns its sequence number
    pub fn record_action(
        &self,
        transaction_id: &str,
        step: &Step,
        inverse_hint: Option<Step>,
    ) -> Result<u64, JournalError> {
        let mut inner = self.inner.lock().unwrap();
        let sequence = {
            let next = inner
                .sequences
                .get_mut(transaction_id)
                .ok_or_else(|| JournalError::UnknownTransaction(transaction_id.to_string()))?;
            let current = *next;
            *next += 1;
            current
        };

        append(
            &mut inner.file,
            &JournalEntry::Action(ActionRecord {
                transaction_id: transaction_id.to_string(),
                sequence,
                tool: step.tool.clone(),
                action: step.action.clone(),
                args: step.args.clone(),
                inverse_hint,
                completed_at: Utc::now(),
                rolled_back: false,
            }),
        )?;
        Ok(sequence)
    }

    /// Close a transaction with its terminal status
    pub fn close(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> Result<(), JournalError> {
        let mut inner = self.inner.lock().unwrap();
        append(
            &mut inner.file,
            &JournalEntry::TxnClosed {
                transaction_id: transaction_id.to_string(),
                status,
                closed_at: Utc::now(),
            },
        )
    }

    /// Mark one action rolled back (appended, log stays append-only)
    pub fn mark_rolled_back(
        &self,
        transaction_id: &str,
        sequence: u64,
    ) -> Result<(), JournalError> {
        let mut inner = self.inner.lock().unwrap();
        append(
            &mut inner.file,
            &JournalEntry::RolledBack {
                transaction_id: transaction_id.to_string(),
                sequence,
                at: Utc::now(),
            },
        )
    }

    /// The `n` most recent completed, not-yet-rolled-back actions,
    /// newest first (by completion time across transactions)
    pub fn latest_actions(&self, n: usize) -> Result<Vec<ActionRecord>, JournalError> {
        let mut actions = self.all_actions()?;
        actions.retain(|a| !a.rolled_back);
        // Appends are serialized, so file order is completion order
        actions.reverse();
        actions.truncate(n);
        Ok(actions)
    }

    /// Every recorded action with rollback marks applied
    pub fn all_actions(&self) -> Result<Vec<ActionRecord>, JournalError> {
        // Hold the lock so replay sees fully flushed lines
        let _guard = self.inner.lock().unwrap();
        let entries = read_entries(&self.path)?;

        let mut actions: Vec<ActionRecord> = Vec::new();
        for entry in &entries {
            if let JournalEntry::Action(record) = entry {
                actions.push(record.clone());
            }
        }
        for entry in &entries {
            if let JournalEntry::RolledBack {
                transaction_id,
                sequence,
                ..
            } = entry
            {
                for action in actions.iter_mut() {
                    if &action.transaction_id == transaction_id && action.sequence == *sequence {
                        action.rolled_back = true;
                    }
                }
            }
        }
        Ok(actions)
    }

    /// Recent transactions, newest first
    pub fn recent_transactions(&self, limit: usize) -> Result<Vec<TransactionSummary>, JournalError> {
        let _guard = self.inner.lock().unwrap();
        let entries = read_entries(&self.path)?;

        let mut summaries: Vec<TransactionSummary> = Vec::new();
        for entry in &entries {
            match entry {
                JournalEntry::TxnOpened {
                    transaction_id,
                    user_input,
                    goal,
                    opened_at,
                } => summaries.push(TransactionSummary {
                    id: transaction_id.clone(),
                    user_input: user_input.clone(),
                    goal: goal.clone(),
                    status: TransactionStatus::Running,
                    opened_at: *opened_at,
                    action_count: 0,
                }),
                JournalEntry::Action(record) => {
                    if let Some(summary) =
                        summaries.iter_mut().find(|s| s.id == record.transaction_id)
                    {
                        summary.action_count += 1;
                    }
                }
                JournalEntry::TxnClosed {
                    transaction_id,
                    status,
                    ..
                } => {
                    if let Some(summary) = summaries.iter_mut().find(|s| &s.id == transaction_id) {
                        summary.status = *status;
                    }
                }
                JournalEntry::RolledBack { .. } => {}
            }
        }

        summaries.reverse();
        summaries.truncate(limit);
        Ok(summaries)
    }
}

fn append(file: &mut File, entry: &JournalEntry) -> Result<(), JournalError> {
    let line = serde_json::to_string(entry)?;
    writeln!(file, "{}", line)?;
    file.flush()?;
    Ok(())
}

fn read_entries(path: &Path) -> Result<Vec<JournalEntry>, JournalError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}
