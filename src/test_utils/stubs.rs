use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use crate::{
    Error, SQLiteTransactionStore, Transaction, TransactionBuilder, TransactionId,
    TransactionStore,
    db::{SharedConnection, initialize},
    parser::{CompletionClient, CompletionRequest, TransactionParser},
};

#[track_caller]
pub(crate) fn get_test_store() -> SQLiteTransactionStore {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    SQLiteTransactionStore::new(SharedConnection::new(connection))
}

#[derive(Debug, Clone)]
enum Reply {
    Content(Option<String>),
    Failure(String),
}

/// A completion client that gives the same reply to every request and
/// records the requests it receives.
#[derive(Debug, Clone)]
pub(crate) struct StubCompletionClient {
    reply: Reply,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl StubCompletionClient {
    pub(crate) fn replying(content: Option<&str>) -> Self {
        Self {
            reply: Reply::Content(content.map(str::to_owned)),
            requests: Arc::default(),
        }
    }

    /// Fail every request with [Error::ExternalService].
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Reply::Failure(message.to_owned()),
            requests: Arc::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionClient for StubCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.requests.lock().unwrap().push(request);

        match &self.reply {
            Reply::Content(content) => Ok(content.clone()),
            Reply::Failure(message) => Err(Error::ExternalService(message.clone())),
        }
    }
}

/// A parser that hands the text to a function instead of a completion
/// service.
#[derive(Debug, Clone)]
pub(crate) struct StubParser {
    parse: fn(&str) -> Result<Vec<TransactionBuilder>, Error>,
}

impl StubParser {
    pub(crate) fn new(parse: fn(&str) -> Result<Vec<TransactionBuilder>, Error>) -> Self {
        Self { parse }
    }
}

impl TransactionParser for StubParser {
    async fn parse(
        &self,
        text: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<TransactionBuilder>, Error> {
        (self.parse)(text)
    }
}

/// A store that records each batch it is asked to save and assigns
/// sequential IDs. Reads find nothing.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingStore {
    batches: Arc<Mutex<Vec<Vec<TransactionBuilder>>>>,
}

impl RecordingStore {
    pub(crate) fn batches(&self) -> Vec<Vec<TransactionBuilder>> {
        self.batches.lock().unwrap().clone()
    }
}

impl TransactionStore for RecordingStore {
    async fn save_batch(
        &self,
        builders: Vec<TransactionBuilder>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, Error> {
        let mut batches = self.batches.lock().unwrap();
        let first_id = batches.iter().map(Vec::len).sum::<usize>() as TransactionId + 1;
        batches.push(builders.clone());

        Ok(builders
            .into_iter()
            .zip(first_id..)
            .map(|(builder, id)| builder.finalise(id))
            .collect())
    }

    async fn get(
        &self,
        _id: TransactionId,
        _cancel: &CancellationToken,
    ) -> Result<Option<Transaction>, Error> {
        Ok(None)
    }

    async fn list(
        &self,
        _limit: i64,
        _offset: i64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, Error> {
        Ok(Vec::new())
    }

    async fn update(
        &self,
        _transaction: Transaction,
        _cancel: &CancellationToken,
    ) -> Result<Transaction, Error> {
        Err(Error::NotFound)
    }

    async fn delete(&self, _id: TransactionId, _cancel: &CancellationToken) -> Result<(), Error> {
        Err(Error::NotFound)
    }
}
