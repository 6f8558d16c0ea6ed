use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::TryStreamExt;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use super::query::{collect_results, describe};
use crate::driver::{NativeConnection, ResultPoll};
use crate::error::SqlMultiplexError;
use crate::results::QueryResult;
use crate::types::{ConnStatus, Interest, PollPhase};

/// Messages received before the batch ended, and the error that ended it.
struct QueryOutput {
    messages: Vec<SimpleQueryMessage>,
    error: Option<tokio_postgres::Error>,
}

// The server stops a simple-query batch at the first failing statement; keep
// everything that completed before it.
async fn run_batch(client: Arc<Client>, sql: String) -> QueryOutput {
    let mut messages = Vec::new();
    let error = match client.simple_query_raw(&sql).await {
        Ok(stream) => {
            let mut stream = std::pin::pin!(stream);
            loop {
                match stream.try_next().await {
                    Ok(Some(message)) => messages.push(message),
                    Ok(None) => break None,
                    Err(e) => break Some(e),
                }
            }
        }
        Err(e) => Some(e),
    };
    QueryOutput { messages, error }
}

/// A non-blocking PostgreSQL connection owned by a pool slot.
pub struct PgConnection {
    runtime: Arc<Runtime>,
    handshake: Option<oneshot::Receiver<Result<Client, tokio_postgres::Error>>>,
    client: Option<Arc<Client>>,
    driver: JoinHandle<()>,
    failure: Arc<Mutex<Option<String>>>,
    in_flight: Option<JoinHandle<QueryOutput>>,
    arrived: Option<Result<QueryOutput, JoinError>>,
    results: Option<VecDeque<QueryResult>>,
}

fn record_failure(slot: &Mutex<Option<String>>, message: String) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        *guard = Some(message);
    }
}

impl PgConnection {
    /// Spawn the handshake; nothing runs until the runtime is next driven.
    pub(crate) fn start(runtime: Arc<Runtime>, config: tokio_postgres::Config) -> Self {
        let (tx, rx) = oneshot::channel();
        let failure = Arc::new(Mutex::new(None));
        let failure_slot = Arc::clone(&failure);

        let driver = runtime.spawn(async move {
            match config.connect(NoTls).await {
                Ok((client, connection)) => {
                    if tx.send(Ok(client)).is_err() {
                        return;
                    }
                    let message = match connection.await {
                        Ok(()) => "server closed the connection".to_string(),
                        Err(e) => describe(&e),
                    };
                    record_failure(&failure_slot, message);
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            }
        });

        Self {
            runtime,
            handshake: Some(rx),
            client: None,
            driver,
            failure,
            in_flight: None,
            arrived: None,
            results: None,
        }
    }

    fn failure_message(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NativeConnection for PgConnection {
    fn status(&self) -> ConnStatus {
        if self.failure_message().is_some() {
            return ConnStatus::Bad;
        }
        match &self.client {
            Some(client) if client.is_closed() || self.driver.is_finished() => ConnStatus::Bad,
            Some(_) => ConnStatus::Ok,
            None if self.handshake.is_some() => ConnStatus::Pending,
            None => ConnStatus::Bad,
        }
    }

    fn wait_ready(
        &mut self,
        interest: Interest,
        timeout: Duration,
    ) -> Result<bool, SqlMultiplexError> {
        tracing::trace!(?interest, ?timeout, "waiting on postgres connection");
        let runtime = Arc::clone(&self.runtime);

        if let Some(rx) = self.handshake.as_mut() {
            match runtime.block_on(async { tokio::time::timeout(timeout, rx).await }) {
                Err(_elapsed) => return Ok(false),
                Ok(Ok(Ok(client))) => self.client = Some(Arc::new(client)),
                Ok(Ok(Err(e))) => record_failure(&self.failure, describe(&e)),
                Ok(Err(_closed)) => record_failure(
                    &self.failure,
                    "connection task ended during the handshake".to_string(),
                ),
            }
            self.handshake = None;
            return Ok(true);
        }

        if let Some(handle) = self.in_flight.as_mut() {
            match runtime.block_on(async { tokio::time::timeout(timeout, handle).await }) {
                Err(_elapsed) => return Ok(false),
                Ok(output) => {
                    self.arrived = Some(output);
                    self.in_flight = None;
                }
            }
            return Ok(true);
        }

        // Nothing outstanding; give the connection task a turn so a dropped
        // socket is noticed.
        runtime.block_on(tokio::task::yield_now());
        Ok(true)
    }

    fn connect_poll(&mut self) -> PollPhase {
        if self.failure_message().is_some() {
            PollPhase::Failed
        } else if self.client.is_some() {
            PollPhase::Ok
        } else if self.handshake.is_some() {
            PollPhase::Reading
        } else {
            PollPhase::Failed
        }
    }

    fn send_query(&mut self, sql: &str) -> Result<(), SqlMultiplexError> {
        let Some(client) = self.client.as_ref() else {
            return Err(SqlMultiplexError::ConnectionError(
                "connection is not established".to_string(),
            ));
        };
        if self.in_flight.is_some() || self.arrived.is_some() {
            return Err(SqlMultiplexError::ExecutionError(
                "another command is already in progress".to_string(),
            ));
        }
        let client = Arc::clone(client);
        let sql = sql.to_owned();
        self.results = None;
        self.in_flight = Some(self.runtime.spawn(run_batch(client, sql)));
        Ok(())
    }

    fn consume_input(&mut self) -> Result<(), SqlMultiplexError> {
        let Some(arrived) = self.arrived.take() else {
            return Ok(());
        };
        let output = arrived.map_err(|e| {
            SqlMultiplexError::ConnectionError(format!("query task failed: {e}"))
        })?;
        let failure = match output.error {
            Some(e) if e.is_closed() => {
                let message = describe(&e);
                record_failure(&self.failure, message.clone());
                return Err(SqlMultiplexError::ConnectionError(message));
            }
            Some(e) => Some(describe(&e)),
            None => None,
        };
        self.results = Some(collect_results(output.messages, failure));
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.arrived.is_some()
    }

    fn next_result(&mut self) -> ResultPoll {
        if let Some(queue) = self.results.as_mut() {
            if let Some(result) = queue.pop_front() {
                return ResultPoll::Ready(result);
            }
            self.results = None;
            return ResultPoll::Complete;
        }
        if self.is_busy() {
            ResultPoll::Pending
        } else {
            ResultPoll::Complete
        }
    }

    fn error_message(&self) -> String {
        if let Some(message) = self.failure_message() {
            return message;
        }
        match &self.client {
            Some(client) if client.is_closed() => "connection closed".to_string(),
            _ => String::new(),
        }
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.driver.abort();
    }
}
