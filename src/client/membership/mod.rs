/**
 * Wishlist and Collection Membership
 *
 * - `remote`: HTTP endpoints for listing, adding and removing entries
 * - `cache`: optimistic client-side projection shared by all views
 * - `optimistic`: ledger of mutations awaiting server confirmation
 * - `locks`: per-(set, card) mutation serialization
 * - `scope`: liveness handles for views that issue refreshes
 */

pub mod cache;
pub mod locks;
pub mod optimistic;
pub mod remote;
pub mod scope;

pub use cache::{MembershipCache, MembershipChange, MembershipTarget, SetPhase};
pub use optimistic::{PendingKind, PendingMutation, PendingMutations};
pub use remote::MembershipApi;
pub use scope::{ScopeToken, ViewScope};
