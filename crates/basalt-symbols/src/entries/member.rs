//! Properties and fields.

use basalt_core::{ConstantValue, DataType, TypeHash};

use super::{Access, ParamEntry};

/// A property, possibly parameterized (an indexer).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub hash: TypeHash,
    pub name: String,
    pub owner: TypeHash,
    pub ty: DataType,
    /// Index parameters; empty for a plain property.
    pub params: Vec<ParamEntry>,
    pub has_getter: bool,
    pub has_setter: bool,
    pub access: Access,
    pub is_shared: bool,
}

impl PropertyEntry {
    pub fn read_write(owner: TypeHash, name: &str, ty: DataType) -> Self {
        Self {
            hash: TypeHash::from_member(owner, name),
            name: name.to_string(),
            owner,
            ty,
            params: Vec::new(),
            has_getter: true,
            has_setter: true,
            access: Access::Public,
            is_shared: false,
        }
    }

    pub fn read_only(owner: TypeHash, name: &str, ty: DataType) -> Self {
        Self {
            has_setter: false,
            ..Self::read_write(owner, name, ty)
        }
    }

    /// An indexed property; overloads are distinguished by their parameter list.
    pub fn indexed(owner: TypeHash, name: &str, params: Vec<ParamEntry>, ty: DataType) -> Self {
        let signature: Vec<String> = params.iter().map(|p| format!("{:?}", p.ty)).collect();
        Self {
            hash: TypeHash::from_signature(owner, name, &signature.join(",")),
            params,
            ..Self::read_write(owner, name, ty)
        }
    }

    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn without_setter(mut self) -> Self {
        self.has_setter = false;
        self
    }
}

/// A field, module variable or enum member.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub hash: TypeHash,
    pub name: String,
    pub owner: TypeHash,
    pub ty: DataType,
    pub access: Access,
    pub is_shared: bool,
    pub is_read_only: bool,
    /// Value of a `Const` field or enum member.
    pub constant: Option<ConstantValue>,
}

impl FieldEntry {
    pub fn new(owner: TypeHash, name: &str, ty: DataType) -> Self {
        Self {
            hash: TypeHash::from_member(owner, name),
            name: name.to_string(),
            owner,
            ty,
            access: Access::Public,
            is_shared: false,
            is_read_only: false,
            constant: None,
        }
    }

    /// A `Const` member; constants are implicitly shared and read-only.
    pub fn constant(owner: TypeHash, name: &str, ty: DataType, value: ConstantValue) -> Self {
        Self {
            is_shared: true,
            is_read_only: true,
            constant: Some(value),
            ..Self::new(owner, name, ty)
        }
    }

    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}
