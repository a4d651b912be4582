//! In-memory [`Database`] implementation.
//!
//! Non-transactional operations apply to the shared [`State`] right away.
//! A [`Tx`] records its writes instead, and replays them over the latest
//! committed [`State`] whenever it reads, so it observes concurrent commits
//! like a read-committed database does. [`Commit`] replays the writes over the
//! shared [`State`] atomically, re-checking every [`Constraint`] on the way.
//!
//! [`Lock`] operations take per-key locks, held until the [`Tx`] is committed
//! or dropped. Outside a [`Tx`] they are no-ops.
//!
//! [`Lock`]: common::operations::Lock

mod impls;

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError},
};

use common::operations::{Commit, Transact};
use derive_more::{Display, Error as StdError};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task,
};
use tracerr::Traced;

#[cfg(doc)]
use crate::infra::Database;
use crate::{
    domain::{appointment, shop, treatment, user, Appointment, Shop, Treatment, User},
    infra::database::{self, Constraint},
};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default)]
pub struct Memory<C = NonTx>(C);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Data stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// [`User`]s by their IDs, deleted ones included.
    users: HashMap<user::Id, User>,

    /// [`user::Session`]s by their tokens.
    sessions: HashMap<user::session::Token, user::Session>,

    /// [`Shop`]s by their IDs.
    shops: HashMap<shop::Id, Shop>,

    /// [`Treatment`]s by their IDs.
    treatments: HashMap<treatment::Id, Treatment>,

    /// [`Appointment`]s by their IDs.
    appointments: HashMap<appointment::Id, Appointment>,
}

/// Change of a [`State`], replayable over any newer [`State`].
///
/// Must check its [`Constraint`]s before mutating anything.
pub type Write = Arc<dyn Fn(&mut State) -> Result<(), Error> + Send + Sync>;

/// Entity a [`Tx`] may lock.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LockKey {
    /// [`User`] row.
    User(user::Id),

    /// [`Shop`] row.
    Shop(shop::Id),

    /// [`Treatment`] row.
    Treatment(treatment::Id),

    /// [`Appointment`] row.
    Appointment(appointment::Id),

    /// Schedule of a barber.
    Schedule(user::Id),
}

/// Storage shared by all the clients of the same [`Memory`] database.
#[derive(Debug, Default)]
pub struct Shared {
    /// Committed [`State`].
    state: StdMutex<State>,

    /// Locks by their [`LockKey`]s.
    locks: StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl Shared {
    /// Returns exclusive access to the committed [`State`].
    fn state(&self) -> StdMutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the lock guarding the provided [`LockKey`].
    fn lock_of(&self, key: LockKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }
}

/// Access to the [`State`] of a [`Memory`] database.
pub trait Storage: Send + Sync {
    /// Returns the [`Shared`] storage of the database.
    fn shared(&self) -> &Shared;

    /// Returns the [`Journal`] of the running transaction, if any.
    fn journal(&self) -> Option<&Journal>;

    /// Runs the provided function over the [`State`] visible to this client.
    ///
    /// # Errors
    ///
    /// If the writes of the running transaction cannot be replayed anymore.
    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> Result<R, Error>;

    /// Applies the provided [`Write`] to the [`State`] visible to this client.
    ///
    /// # Errors
    ///
    /// If the [`Write`] violates a [`Constraint`].
    fn write(&self, write: Write) -> Result<(), Error>;
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// [`Shared`] storage.
    shared: Arc<Shared>,
}

impl Storage for NonTx {
    fn shared(&self) -> &Shared {
        &self.shared
    }

    fn journal(&self) -> Option<&Journal> {
        None
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> Result<R, Error> {
        Ok(f(&self.shared.state()))
    }

    fn write(&self, write: Write) -> Result<(), Error> {
        write(&mut *self.shared.state())
    }
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Shared`] storage.
    shared: Arc<Shared>,

    /// [`Journal`] of this transaction, shared by its clones.
    journal: Arc<Journal>,
}

impl Tx {
    /// Builds the [`State`] visible to this transaction: the committed one
    /// with the provided `writes` replayed over it.
    fn view(&self, writes: &[Write]) -> Result<State, Error> {
        let mut view = self.shared.state().clone();
        for w in writes {
            w(&mut view)?;
        }
        Ok(view)
    }
}

impl Storage for Tx {
    fn shared(&self) -> &Shared {
        &self.shared
    }

    fn journal(&self) -> Option<&Journal> {
        Some(&self.journal)
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> Result<R, Error> {
        let writes = self.journal.writes();
        let view = self.view(writes.as_deref().unwrap_or_default())?;
        drop(writes);
        Ok(f(&view))
    }

    fn write(&self, write: Write) -> Result<(), Error> {
        let mut writes = self.journal.writes();
        let writes = writes.as_mut().ok_or(Error::AlreadyCommitted)?;
        write(&mut self.view(writes)?)?;
        writes.push(write);
        Ok(())
    }
}

/// Progress of a [`Tx`].
pub struct Journal {
    /// [`Write`]s done so far.
    ///
    /// [`None`] once committed.
    writes: StdMutex<Option<Vec<Write>>>,

    /// Locks held until commit.
    locks: StdMutex<HashMap<LockKey, OwnedMutexGuard<()>>>,
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("writes", &self.writes().as_ref().map(Vec::len))
            .field("locks", &self.locks().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Journal {
    /// Starts a new [`Journal`].
    fn new() -> Self {
        Self {
            writes: StdMutex::new(Some(Vec::new())),
            locks: StdMutex::default(),
        }
    }

    /// Returns the recorded [`Write`]s.
    fn writes(&self) -> StdMutexGuard<'_, Option<Vec<Write>>> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the held locks.
    fn locks(&self) -> StdMutexGuard<'_, HashMap<LockKey, OwnedMutexGuard<()>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Storage> Memory<C> {
    /// Runs the provided function over the [`State`] visible to this client.
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        task::yield_now().await;
        self.0
            .read(f)
            .map_err(|e| tracerr::new!(database::Error::from(e)))
    }

    /// Applies the provided write to the [`State`] visible to this client.
    async fn write(
        &self,
        write: impl Fn(&mut State) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Result<(), Traced<database::Error>> {
        task::yield_now().await;
        self.0
            .write(Arc::new(write))
            .map_err(|e| tracerr::new!(database::Error::from(e)))
    }

    /// Takes the lock of the provided [`LockKey`] until the running
    /// transaction ends.
    ///
    /// Re-entrant within the same transaction.
    async fn lock(&self, key: LockKey) {
        let Some(journal) = self.0.journal() else {
            return;
        };
        if journal.locks().contains_key(&key) {
            return;
        }
        let guard = self.0.shared().lock_of(key).lock_owned().await;
        drop(journal.locks().insert(key, guard));
    }
}

impl database::Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx {
            shared: Arc::clone(&self.0.shared),
            journal: Arc::new(Journal::new()),
        }))
    }
}

impl database::Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl database::Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let Tx { shared, journal } = &self.0;
        let writes = journal
            .writes()
            .take()
            .ok_or(Error::AlreadyCommitted)
            .map_err(|e| tracerr::new!(database::Error::from(e)))?;

        let mut state = shared.state();
        let mut next = state.clone();
        let replayed = writes.iter().try_for_each(|w| w(&mut next));
        if replayed.is_ok() {
            *state = next;
        }
        drop(state);

        journal.locks().clear();
        replayed.map_err(|e| tracerr::new!(database::Error::from(e)))
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction has been committed already.
    #[display("Transaction is already committed")]
    AlreadyCommitted,

    /// Uniqueness [`Constraint`] is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] Constraint),
}

impl Error {
    /// Returns the uniqueness [`Constraint`] this [`Error`] reports a
    /// violation of, if any.
    #[must_use]
    pub fn violated(&self) -> Option<Constraint> {
        match self {
            Self::UniqueViolation(c) => Some(*c),
            Self::AlreadyCommitted => None,
        }
    }
}

/// Ensures the provided `constraint` holds, returning an [`Error`] otherwise.
fn ensure(holds: bool, constraint: Constraint) -> Result<(), Error> {
    if holds {
        Ok(())
    } else {
        Err(Error::UniqueViolation(constraint))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact},
        DateTime,
    };
    use tokio::time;

    use super::Memory;
    use crate::{
        domain::{user, User},
        infra::{database::Constraint, Database as _},
    };

    fn user(email: &str) -> User {
        // SAFETY: Hash is never verified in these tests.
        #[expect(unsafe_code, reason = "test")]
        let password_hash = unsafe { user::PasswordHash::new_unchecked("x") };
        User {
            id: user::Id::new(),
            name: user::Name::new("Jane").unwrap(),
            email: user::Email::new(email).unwrap(),
            password_hash,
            phone: None,
            role: user::Role::Client,
            shop_id: None,
            specialties: vec![],
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        }
    }

    async fn find(db: &Memory, id: user::Id) -> Option<User> {
        db.execute(Select(By::<Option<User>, _>::new(id)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn commits_recorded_changes() {
        let db = Memory::new();
        let u = user("jane@example.com");

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(u.clone())).await.unwrap();
        assert!(find(&db, u.id).await.is_none(), "visible before commit");
        tx.execute(Commit).await.unwrap();

        assert_eq!(find(&db, u.id).await.map(|u| u.id), Some(u.id));
        assert!(tx.execute(Commit).await.is_err(), "committed twice");
    }

    #[tokio::test]
    async fn rolls_back_on_drop() {
        let db = Memory::new();
        let u = user("jane@example.com");

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(u.clone())).await.unwrap();
        drop(tx);

        assert!(find(&db, u.id).await.is_none());
    }

    #[tokio::test]
    async fn reads_own_and_committed_writes() {
        let db = Memory::new();
        let (jane, john) = (user("jane@example.com"), user("john@example.com"));

        let tx1 = db.execute(Transact).await.unwrap();
        let tx2 = db.execute(Transact).await.unwrap();
        tx1.execute(Insert(jane.clone())).await.unwrap();
        tx2.execute(Insert(john.clone())).await.unwrap();
        tx2.execute(Commit).await.unwrap();

        let seen = |id| tx1.execute(Select(By::<Option<User>, _>::new(id)));
        assert!(seen(jane.id).await.unwrap().is_some());
        assert!(seen(john.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rechecks_constraints_on_commit() {
        let db = Memory::new();

        let tx1 = db.execute(Transact).await.unwrap();
        let tx2 = db.execute(Transact).await.unwrap();
        tx1.execute(Insert(user("jane@example.com"))).await.unwrap();
        tx2.execute(Insert(user("jane@example.com"))).await.unwrap();
        tx1.execute(Commit).await.unwrap();

        let err = tx2.execute(Commit).await.unwrap_err();
        assert_eq!(err.as_ref().violated(), Some(Constraint::UserEmail));
    }

    #[tokio::test]
    async fn guards_email_uniqueness() {
        let db = Memory::new();

        db.execute(Insert(user("jane@example.com"))).await.unwrap();
        let err = db
            .execute(Insert(user("jane@example.com")))
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().violated(), Some(Constraint::UserEmail));
    }

    #[tokio::test]
    async fn holds_locks_until_transaction_ends() {
        let db = Memory::new();
        let id = user::Id::new();

        let tx1 = db.execute(Transact).await.unwrap();
        tx1.execute(Lock(By::<User, _>::new(id))).await.unwrap();
        tx1.execute(Lock(By::<User, _>::new(id))).await.unwrap();

        let tx2 = db.execute(Transact).await.unwrap();
        let blocked = time::timeout(
            Duration::from_millis(50),
            tx2.execute(Lock(By::<User, _>::new(id))),
        )
        .await;
        assert!(blocked.is_err(), "lock is taken twice");

        tx1.execute(Commit).await.unwrap();
        time::timeout(
            Duration::from_millis(50),
            tx2.execute(Lock(By::<User, _>::new(id))),
        )
        .await
        .expect("lock is not released on commit")
        .unwrap();
    }
}
