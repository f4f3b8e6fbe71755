//! Declared types: classes, structures, interfaces, enums, delegates, modules.

use basalt_core::{DataType, PrimitiveKind, TypeHash};

use super::{Access, GenericParamEntry, MemberRef, Variance};

/// What kind of declared type an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class { is_abstract: bool },
    Structure,
    Interface,
    Enum { underlying: PrimitiveKind },
    Delegate,
    /// A standard module; its members are promoted into the enclosing namespace.
    Module,
}

impl TypeKind {
    pub fn is_value(self) -> bool {
        matches!(self, TypeKind::Structure | TypeKind::Enum { .. })
    }

    pub fn is_reference(self) -> bool {
        !self.is_value()
    }
}

/// Registry entry for a declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name (with namespace).
    pub qualified_name: String,
    /// Containing namespace (empty for the global namespace).
    pub namespace: String,
    pub hash: TypeHash,
    pub kind: TypeKind,
    pub access: Access,

    // === Inheritance ===
    /// Base class; `None` means `Object` for classes.
    pub base: Option<DataType>,
    /// Directly implemented (or inherited, for interfaces) interfaces.
    pub interfaces: Vec<DataType>,
    pub generic_params: Vec<GenericParamEntry>,

    // === Members ===
    /// Members in declaration order.
    pub members: Vec<MemberRef>,
    /// Name of the default member, if the type has one.
    pub default_member: Option<String>,
    /// `Invoke` procedure of a delegate type.
    pub invoke: Option<TypeHash>,

    // === Interop ===
    /// Concrete class that `New` on this interface constructs.
    pub coclass: Option<TypeHash>,
    /// Embedded (no-PIA) interop type; constructed through its class identifier.
    pub embedded_interop: bool,
    /// Class identifier used for embedded construction.
    pub guid: Option<String>,
    /// Legacy dispatch interface: member access is late bound.
    pub is_dispatch: bool,
}

impl TypeEntry {
    fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: name.to_string(),
            namespace: String::new(),
            hash: TypeHash::from_name(name),
            kind,
            access: Access::Public,
            base: None,
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            members: Vec::new(),
            default_member: None,
            invoke: None,
            coclass: None,
            embedded_interop: false,
            guid: None,
            is_dispatch: false,
        }
    }

    pub fn class(name: &str) -> Self {
        Self::new(name, TypeKind::Class { is_abstract: false })
    }

    pub fn abstract_class(name: &str) -> Self {
        Self::new(name, TypeKind::Class { is_abstract: true })
    }

    pub fn structure(name: &str) -> Self {
        Self::new(name, TypeKind::Structure)
    }

    pub fn interface(name: &str) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn enumeration(name: &str, underlying: PrimitiveKind) -> Self {
        Self::new(name, TypeKind::Enum { underlying })
    }

    pub fn delegate(name: &str) -> Self {
        Self::new(name, TypeKind::Delegate)
    }

    pub fn module(name: &str) -> Self {
        Self::new(name, TypeKind::Module)
    }

    // === Builder Methods ===

    /// Place the type in a namespace; recomputes the qualified name and hash.
    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self.qualified_name = if namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{namespace}.{}", self.name)
        };
        self.rehash();
        self
    }

    /// Generic types of different arity may share a name, so the arity is
    /// part of the identity.
    fn rehash(&mut self) {
        self.hash = if self.generic_params.is_empty() {
            TypeHash::from_name(&self.qualified_name)
        } else {
            TypeHash::from_name(&format!("{}`{}", self.qualified_name, self.generic_params.len()))
        };
    }

    pub fn with_base(mut self, base: DataType) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_interface(mut self, interface: DataType) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a generic parameter. Set these before taking the hash.
    pub fn with_generic_param(mut self, param: GenericParamEntry) -> Self {
        self.generic_params.push(param);
        self.rehash();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_default_member(mut self, name: &str) -> Self {
        self.default_member = Some(name.to_string());
        self
    }

    pub fn with_coclass(mut self, coclass: TypeHash) -> Self {
        self.coclass = Some(coclass);
        self
    }

    /// Mark as an embedded interop type with the given class identifier.
    pub fn embedded(mut self, guid: &str) -> Self {
        self.embedded_interop = true;
        self.guid = Some(guid.to_string());
        self
    }

    pub fn dispatch(mut self) -> Self {
        self.is_dispatch = true;
        self
    }

    // === Query Methods ===

    /// The type as a `DataType`, instantiated over its own generic parameters.
    pub fn self_type(&self) -> DataType {
        let args = (0..self.generic_params.len() as u32)
            .map(|index| DataType::GenericParam {
                owner: self.hash,
                index,
            })
            .collect();
        DataType::generic(self.hash, args)
    }

    /// Placeholder for generic parameter `index` of this type.
    pub fn generic_param(&self, index: u32) -> DataType {
        DataType::GenericParam {
            owner: self.hash,
            index,
        }
    }

    pub fn arity(&self) -> usize {
        self.generic_params.len()
    }

    pub fn variance(&self, index: usize) -> Variance {
        self.generic_params
            .get(index)
            .map(|p| p.variance)
            .unwrap_or_default()
    }

    pub fn is_value_type(&self) -> bool {
        self.kind.is_value()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class { .. })
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Class { is_abstract: true }) || self.is_interface()
    }

    pub fn is_delegate(&self) -> bool {
        self.kind == TypeKind::Delegate
    }

    pub fn is_module(&self) -> bool {
        self.kind == TypeKind::Module
    }

    pub fn enum_underlying(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Enum { underlying } => Some(underlying),
            _ => None,
        }
    }
}
