//! Login/registration handshake state machine
//!
//! One [`AuthSession`] lives per connection, from accept until the client
//! is either admitted to chat or rejected. Each state owns exactly one
//! prompt; the handler sends it, waits for the next decoded record and
//! feeds it to [`AuthSession::advance`]. Anything unexpected (an unknown
//! choice, a bad password, a taken name) ends the session; there is no
//! retry within a connection.
//!
//! The notice texts are part of the protocol: the terminal client matches
//! on them to decide when to switch into chat mode.

use crate::error::StoreError;
use crate::store::CredentialStore;

/// Rejection notice for a failed login
pub const WRONG_PASSWORD: &str = "Wrong password or unknown username.";

/// Rejection notice for a registration under an existing name
pub const USERNAME_TAKEN: &str = "Username taken.";

/// Rejection notice for a blank registration name
pub const EMPTY_USERNAME: &str = "Username cannot be empty.";

/// Rejection notice for an unrecognized handshake choice
pub const INVALID_CHOICE: &str = "Unrecognized choice. Goodbye.";

const PROMPT_CHOICE: &str = "Welcome! Type 'login' or 'register':";
const PROMPT_LOGIN_USERNAME: &str = "Username:";
const PROMPT_LOGIN_PASSWORD: &str = "Password:";
const PROMPT_REGISTER_USERNAME: &str = "Choose a username:";
const PROMPT_REGISTER_PASSWORD: &str = "Choose a password:";

/// Handshake states
///
/// `Authenticated` and `Rejected` are not states but terminal outcomes,
/// surfaced through [`AuthOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthState {
    AwaitChoice,
    AwaitUsernameLogin,
    AwaitPasswordLogin { username: String },
    AwaitUsernameRegister,
    AwaitPasswordRegister { username: String },
}

/// Result of feeding one record to the state machine
#[derive(Debug)]
pub enum AuthOutcome {
    /// Handshake continues; send the next session's prompt
    Continue(AuthSession),
    /// Client is admitted under this identity
    Authenticated(String),
    /// Handshake failed; send the notice and close
    Rejected(&'static str),
}

/// Per-connection handshake session
#[derive(Debug)]
pub struct AuthSession {
    state: AuthState,
}

impl AuthSession {
    /// Start a fresh handshake in `AwaitChoice`
    pub fn new() -> Self {
        Self {
            state: AuthState::AwaitChoice,
        }
    }

    /// The prompt the client must answer in the current state
    pub fn prompt(&self) -> &'static str {
        match &self.state {
            AuthState::AwaitChoice => PROMPT_CHOICE,
            AuthState::AwaitUsernameLogin => PROMPT_LOGIN_USERNAME,
            AuthState::AwaitPasswordLogin { .. } => PROMPT_LOGIN_PASSWORD,
            AuthState::AwaitUsernameRegister => PROMPT_REGISTER_USERNAME,
            AuthState::AwaitPasswordRegister { .. } => PROMPT_REGISTER_PASSWORD,
        }
    }

    /// Consume one trimmed client answer and move the handshake forward
    pub async fn advance(
        self,
        input: &str,
        store: &dyn CredentialStore,
    ) -> Result<AuthOutcome, StoreError> {
        let outcome = match self.state {
            AuthState::AwaitChoice => {
                if input.eq_ignore_ascii_case("login") {
                    AuthOutcome::Continue(Self {
                        state: AuthState::AwaitUsernameLogin,
                    })
                } else if input.eq_ignore_ascii_case("register") {
                    AuthOutcome::Continue(Self {
                        state: AuthState::AwaitUsernameRegister,
                    })
                } else {
                    AuthOutcome::Rejected(INVALID_CHOICE)
                }
            }
            AuthState::AwaitUsernameLogin => AuthOutcome::Continue(Self {
                state: AuthState::AwaitPasswordLogin {
                    username: input.to_string(),
                },
            }),
            AuthState::AwaitPasswordLogin { username } => {
                if store.verify(&username, input).await? {
                    AuthOutcome::Authenticated(username)
                } else {
                    AuthOutcome::Rejected(WRONG_PASSWORD)
                }
            }
            AuthState::AwaitUsernameRegister => {
                if input.is_empty() {
                    AuthOutcome::Rejected(EMPTY_USERNAME)
                } else if store.exists(input).await? {
                    AuthOutcome::Rejected(USERNAME_TAKEN)
                } else {
                    AuthOutcome::Continue(Self {
                        state: AuthState::AwaitPasswordRegister {
                            username: input.to_string(),
                        },
                    })
                }
            }
            AuthState::AwaitPasswordRegister { username } => {
                // register() re-checks the name; a concurrent duplicate
                // resolves to exactly one winner.
                if store.register(&username, input).await? {
                    AuthOutcome::Authenticated(username)
                } else {
                    AuthOutcome::Rejected(USERNAME_TAKEN)
                }
            }
        };
        Ok(outcome)
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;

    const TEST_COST: u32 = 4;

    async fn run(store: &MemoryUserStore, answers: &[&str]) -> AuthOutcome {
        let mut session = AuthSession::new();
        for (i, answer) in answers.iter().enumerate() {
            match session.advance(answer, store).await.unwrap() {
                AuthOutcome::Continue(next) => session = next,
                outcome => {
                    assert_eq!(i, answers.len() - 1, "handshake ended early");
                    return outcome;
                }
            }
        }
        panic!("handshake did not reach a terminal outcome");
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryUserStore::with_cost(TEST_COST);

        match run(&store, &["register", "alice", "secret"]).await {
            AuthOutcome::Authenticated(name) => assert_eq!(name, "alice"),
            outcome => panic!("expected authentication, got {:?}", outcome),
        }

        match run(&store, &["login", "alice", "secret"]).await {
            AuthOutcome::Authenticated(name) => assert_eq!(name, "alice"),
            outcome => panic!("expected authentication, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_wrong_password_rejects() {
        let store = MemoryUserStore::with_cost(TEST_COST);
        store.register("alice", "secret").await.unwrap();

        match run(&store, &["login", "alice", "nope"]).await {
            AuthOutcome::Rejected(notice) => assert_eq!(notice, WRONG_PASSWORD),
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_unknown_user_login_rejects() {
        let store = MemoryUserStore::with_cost(TEST_COST);

        match run(&store, &["login", "ghost", "secret"]).await {
            AuthOutcome::Rejected(notice) => assert_eq!(notice, WRONG_PASSWORD),
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_taken_username_rejects_at_username_step() {
        let store = MemoryUserStore::with_cost(TEST_COST);
        store.register("alice", "secret").await.unwrap();

        match run(&store, &["register", "alice"]).await {
            AuthOutcome::Rejected(notice) => assert_eq!(notice, USERNAME_TAKEN),
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_empty_register_username_rejects_with_own_notice() {
        let store = MemoryUserStore::with_cost(TEST_COST);

        match run(&store, &["register", ""]).await {
            AuthOutcome::Rejected(notice) => assert_eq!(notice, EMPTY_USERNAME),
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_invalid_choice_rejects() {
        let store = MemoryUserStore::with_cost(TEST_COST);

        match run(&store, &["frobnicate"]).await {
            AuthOutcome::Rejected(notice) => assert_eq!(notice, INVALID_CHOICE),
            outcome => panic!("expected rejection, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_choice_is_case_insensitive() {
        let store = MemoryUserStore::with_cost(TEST_COST);

        match run(&store, &["REGISTER", "bob", "pw"]).await {
            AuthOutcome::Authenticated(name) => assert_eq!(name, "bob"),
            outcome => panic!("expected authentication, got {:?}", outcome),
        }
    }

    #[test]
    fn test_each_state_has_one_prompt() {
        let session = AuthSession::new();
        assert_eq!(session.prompt(), PROMPT_CHOICE);
    }
}
