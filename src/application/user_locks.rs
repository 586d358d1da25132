use crate::domain::types::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Per-user async mutex registry.
///
/// Every cash-mutating operation (trade or reload) holds the user's lock from
/// validation through commit, so two concurrent requests for the same user
/// cannot interleave between the holdings/affordability check and the write.
/// Different users never contend.
#[derive(Default)]
pub struct UserLocks {
    inner: StdMutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().expect("user lock registry poisoned");
        map.entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_user_gets_same_lock() {
        let locks = UserLocks::new();
        let a = locks.for_user(1);
        let b = locks.for_user(1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = UserLocks::new();
        let a = locks.for_user(1);
        let b = locks.for_user(2);

        let _guard_a = a.lock().await;
        // Would deadlock if user 2 shared user 1's lock.
        let _guard_b = b.lock().await;
    }
}
