/// UID -> account name lookup. A missing account is a normal outcome.
pub trait UserDirectory {
    fn user_name(&self, uid: u32) -> Option<String>;
}

/// Looks accounts up in the system user database (NSS).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemUsers;

impl UserDirectory for SystemUsers {
    fn user_name(&self, uid: u32) -> Option<String> {
        uzers::get_user_by_uid(uid).map(|user| user.name().to_string_lossy().to_string())
    }
}
