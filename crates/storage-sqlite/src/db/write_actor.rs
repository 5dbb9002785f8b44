use super::{get_connection, DbPool};
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::debug;
use std::any::Any;
use stockpile_core::errors::{DatabaseError, Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// A write job runs against the writer's connection inside one transaction.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type AnyResult = Result<Box<dyn Any + Send + 'static>>;

/// Handle for sending jobs to the writer actor.
///
/// The actor stops once every handle has been dropped.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job<Box<dyn Any + Send + 'static>>, oneshot::Sender<AnyResult>)>,
}

impl WriteHandle {
    /// Runs `job` on the writer's connection inside an immediate transaction.
    ///
    /// An `Err` from the job rolls back everything it wrote.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_stopped())?;

        let boxed = ret_rx.await.map_err(|_| writer_stopped())??;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("writer returned an unexpected result type".to_string()))
    }
}

fn writer_stopped() -> Error {
    Error::Database(DatabaseError::Internal(
        "writer task is no longer running".to_string(),
    ))
}

/// Spawns the single task that performs every write.
///
/// The task owns one pooled connection for its whole life and runs jobs one
/// at a time, so SQLite never sees two writers. Must be called from within a
/// Tokio runtime. The returned `JoinHandle` completes after the last
/// `WriteHandle` is dropped and the connection is back in the pool.
pub fn spawn_writer(pool: &DbPool) -> Result<(WriteHandle, JoinHandle<()>)> {
    let mut conn = get_connection(pool)?;
    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<AnyResult>,
    )>(1024);

    let task = tokio::spawn(async move {
        while let Some((job, reply_tx)) = rx.recv().await {
            let result: AnyResult = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            // The caller may have gone away; nothing to report to.
            let _ = reply_tx.send(result);
        }
        debug!("Writer task stopped");
    });

    Ok((WriteHandle { tx }, task))
}
