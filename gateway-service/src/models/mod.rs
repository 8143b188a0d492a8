pub mod auth;
pub mod invite;
pub mod mfa;
pub mod policy;
pub mod record;
pub mod session;
pub mod tenant;
pub mod user;

pub use auth::{LoginResult, RegisterResult, UpdateMeResult};
pub use invite::{InviteOutcome, PendingInvite};
pub use mfa::{DeviceSummary, MfaVerification, TotpDevice};
pub use policy::{
    is_system_role, Action, EntityPermission, PermissionSet, Role, RolePolicy, ADMIN_ROLE,
    SYSTEM_IAM_ENTITY, SYSTEM_ROLES, WILDCARD_ENTITY,
};
pub use record::{DeleteOutcome, QueryFilter, QueryPagination, QuerySort, Record, RecordPage, RecordQuery};
pub use session::{IssuedSession, Session, SessionTokens, SessionTrustPayload};
pub use tenant::{Tenant, PUBLIC_TENANT_ID};
pub use user::{TenantUsersPage, User, UserProfile, UserUpdate};
