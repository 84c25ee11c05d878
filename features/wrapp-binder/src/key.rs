//! Interned binding identities.

use std::{
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::types::TypeInfo;

/// Value part of a [BindingKey]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyData {
    pub info: TypeInfo,
    /// Key only used for member injection into existing instances
    pub member: bool,
    /// Key of a binding that was discovered rather than registered
    pub implicit: bool,
    pub qualifier: Option<&'static str>,
}

/// Process wide, append only. Entries live as long as the process.
static INTERNED: Lazy<RwLock<HashSet<&'static KeyData>>> = Lazy::new(Default::default);

/// Canonical identity of a binding
///
/// Keys are interned, two keys built from the same parts point to the same
/// [KeyData], so equality and hashing only look at the address.
#[derive(Clone, Copy)]
pub struct BindingKey(&'static KeyData);

impl BindingKey {
    pub fn get(
        info: TypeInfo,
        implicit: bool,
        member: bool,
        qualifier: Option<&'static str>,
    ) -> BindingKey {
        let data = KeyData {
            info,
            member,
            implicit,
            qualifier,
        };

        if let Some(existing) = INTERNED.read().get(&data) {
            return BindingKey(*existing);
        }

        let mut interned = INTERNED.write();
        // Another writer may have won the race between the two locks
        if let Some(existing) = interned.get(&data) {
            return BindingKey(*existing);
        }
        let leaked: &'static KeyData = Box::leak(Box::new(data));
        interned.insert(leaked);
        BindingKey(leaked)
    }

    /// Key requested by `resolve`
    pub fn of(info: TypeInfo) -> BindingKey {
        Self::get(info, false, false, None)
    }

    pub fn named(info: TypeInfo, qualifier: &'static str) -> BindingKey {
        Self::get(info, false, false, Some(qualifier))
    }

    /// Key of the members-only binding of a type
    pub fn members_of(info: TypeInfo) -> BindingKey {
        Self::get(info, false, true, None)
    }

    /// Same key, flagged as implicit
    pub fn as_implicit(self) -> BindingKey {
        Self::get(self.0.info, true, self.0.member, self.0.qualifier)
    }

    pub fn info(&self) -> TypeInfo {
        self.0.info
    }

    pub fn is_member(&self) -> bool {
        self.0.member
    }

    pub fn is_implicit(&self) -> bool {
        self.0.implicit
    }

    pub fn qualifier(&self) -> Option<&'static str> {
        self.0.qualifier
    }

    pub fn data(&self) -> &'static KeyData {
        self.0
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}
impl Eq for BindingKey {}

impl Hash for BindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state)
    }
}

impl fmt::Debug for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BindingKey({self})")
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.info.type_name)?;
        if let Some(qualifier) = self.0.qualifier {
            write!(f, "#{qualifier}")?;
        }
        if self.0.member {
            f.write_str(" [members]")?;
        }
        if self.0.implicit {
            f.write_str(" [implicit]")?;
        }
        Ok(())
    }
}
