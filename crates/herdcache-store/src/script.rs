//! Atomic check-then-act scripts.
//!
//! Each script compares the value stored under `KEYS[1]` with the caller's
//! token in `ARGV[1]` and only acts when they are equal. Running the
//! comparison and the mutation as one server-side script closes the window in
//! which a lease could expire (and be re-acquired by someone else) between a
//! separate GET and DEL.

use std::fmt;

/// The closed set of scripts the workspace runs against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicScript {
    /// `KEYS[1]` lock key, `ARGV[1]` token. Returns 1 if deleted, 0 otherwise.
    CompareAndDelete,
    /// `KEYS[1]` lock key, `ARGV[1]` token, `ARGV[2]` lease in milliseconds.
    /// Returns 1 if the TTL was reset, 0 otherwise.
    CompareAndExpire,
}

const COMPARE_AND_DELETE: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
";

const COMPARE_AND_EXPIRE: &str = r"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('pexpire', KEYS[1], ARGV[2])
else
    return 0
end
";

impl AtomicScript {
    /// Returns the Lua body executed by script-capable stores.
    pub fn source(&self) -> &'static str {
        match self {
            AtomicScript::CompareAndDelete => COMPARE_AND_DELETE,
            AtomicScript::CompareAndExpire => COMPARE_AND_EXPIRE,
        }
    }

    /// Returns a short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            AtomicScript::CompareAndDelete => "compare_and_delete",
            AtomicScript::CompareAndExpire => "compare_and_expire",
        }
    }

    /// Number of `KEYS` the script expects.
    pub fn key_count(&self) -> usize {
        1
    }

    /// Number of `ARGV` entries the script expects.
    pub fn arg_count(&self) -> usize {
        match self {
            AtomicScript::CompareAndDelete => 1,
            AtomicScript::CompareAndExpire => 2,
        }
    }
}

impl fmt::Display for AtomicScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_compare_before_acting() {
        for script in [AtomicScript::CompareAndDelete, AtomicScript::CompareAndExpire] {
            let body = script.source();
            let compare = body.find("== ARGV[1]").unwrap();
            let act = body.find("return redis.call(").unwrap();
            assert!(compare < act, "{script} must compare before mutating");
        }
    }

    #[test]
    fn test_arity() {
        assert_eq!(AtomicScript::CompareAndDelete.arg_count(), 1);
        assert_eq!(AtomicScript::CompareAndExpire.arg_count(), 2);
        assert!(AtomicScript::CompareAndExpire.source().contains("pexpire"));
    }
}
