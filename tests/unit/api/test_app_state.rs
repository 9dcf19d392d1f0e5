// Shared state must be usable across tokio worker threads

use finplan_identity::api::AppState;
use finplan_identity::auth::audit_logger::AuditLogger;
use finplan_identity::auth::{EdgeAuthState, LocalTokenVerifier};
use finplan_identity::config::Config;
use finplan_identity::core::crypto::{SharedSecret, TokenSigner};
use finplan_identity::identity::IdentityService;
use finplan_identity::proxy::{HttpDownstreamClient, HttpIdentityClient, LocalIdentityClient};
use finplan_identity::store::{InMemoryCredentialStore, PgCredentialStore};
use static_assertions::assert_impl_all;

assert_impl_all!(AppState: Send, Sync, Clone);
assert_impl_all!(EdgeAuthState: Send, Sync, Clone);
assert_impl_all!(IdentityService: Send, Sync, Clone);
assert_impl_all!(Config: Send, Sync, Clone);
assert_impl_all!(TokenSigner: Send, Sync);
assert_impl_all!(SharedSecret: Send, Sync, Clone);
assert_impl_all!(AuditLogger: Send, Sync);
assert_impl_all!(LocalTokenVerifier: Send, Sync);
assert_impl_all!(InMemoryCredentialStore: Send, Sync);
assert_impl_all!(PgCredentialStore: Send, Sync);
assert_impl_all!(HttpIdentityClient: Send, Sync);
assert_impl_all!(LocalIdentityClient: Send, Sync);
assert_impl_all!(HttpDownstreamClient: Send, Sync);
