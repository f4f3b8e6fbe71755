//! Procedures: methods, constructors, operators and conversion operators.

use basalt_core::{ConstantValue, DataType, TypeHash};

use super::{Access, GenericParamEntry};

/// Compiler-recognized caller-information attributes on optional parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallerInfo {
    /// Line number of the call site.
    LineNumber,
    /// Name of the member containing the call site.
    MemberName,
    /// Source file path of the call site.
    FilePath,
}

/// Legacy COM default markers on optional `Object` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComDefault {
    /// `IDispatchConstant`: default is a dispatch wrapper around `Nothing`.
    Dispatch,
    /// `IUnknownConstant`: default is an unknown wrapper around `Nothing`.
    Unknown,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub ty: DataType,
    pub by_ref: bool,
    pub is_optional: bool,
    /// Declared default of an optional parameter.
    pub default: Option<ConstantValue>,
    /// Trailing `ParamArray`; `ty` is then an array type.
    pub is_param_array: bool,
    pub caller_info: Option<CallerInfo>,
    pub com_default: Option<ComDefault>,
}

impl ParamEntry {
    pub fn new(name: &str, ty: DataType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            by_ref: false,
            is_optional: false,
            default: None,
            is_param_array: false,
            caller_info: None,
            com_default: None,
        }
    }

    pub fn by_ref(name: &str, ty: DataType) -> Self {
        Self {
            by_ref: true,
            ..Self::new(name, ty)
        }
    }

    pub fn optional(name: &str, ty: DataType, default: ConstantValue) -> Self {
        Self {
            is_optional: true,
            default: Some(default),
            ..Self::new(name, ty)
        }
    }

    /// Optional without a declared default (COM-style `Object` parameters).
    pub fn optional_missing(name: &str, ty: DataType) -> Self {
        Self {
            is_optional: true,
            ..Self::new(name, ty)
        }
    }

    /// `ParamArray name As element()`.
    pub fn param_array(name: &str, element: DataType) -> Self {
        Self {
            is_param_array: true,
            ..Self::new(name, DataType::array(element, 1))
        }
    }

    pub fn with_caller_info(mut self, info: CallerInfo) -> Self {
        self.caller_info = Some(info);
        self
    }

    pub fn with_com_default(mut self, marker: ComDefault) -> Self {
        self.com_default = Some(marker);
        self
    }
}

/// What kind of procedure an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Method,
    Constructor,
    /// A user-defined operator (`op_Addition`, ...).
    Operator,
    /// A user-defined conversion operator (`Widening`/`Narrowing Operator CType`).
    Conversion { widening: bool },
}

/// Registry entry for one overload of a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureEntry {
    pub hash: TypeHash,
    pub name: String,
    /// Declaring type or module.
    pub owner: TypeHash,
    pub kind: ProcedureKind,
    pub params: Vec<ParamEntry>,
    /// `Void` for a `Sub`.
    pub return_type: DataType,
    pub generic_params: Vec<GenericParamEntry>,
    /// Owner used by `DataType::GenericParam` for this procedure's own parameters.
    pub generic_owner: TypeHash,
    pub access: Access,
    pub is_shared: bool,
    /// Extension method: the first parameter is the receiver.
    pub is_extension: bool,
    /// Extension method usable as a default property of its receiver.
    pub is_default_extension: bool,
}

fn render_signature(kind: ProcedureKind, params: &[ParamEntry], return_type: &DataType) -> String {
    let mut out = format!("{kind:?}(");
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if p.by_ref {
            out.push('&');
        }
        out.push_str(&format!("{:?}", p.ty));
    }
    out.push_str(&format!("){return_type:?}"));
    out
}

impl ProcedureEntry {
    fn build(owner: TypeHash, name: &str, kind: ProcedureKind, params: Vec<ParamEntry>, return_type: DataType) -> Self {
        let hash = TypeHash::from_signature(owner, name, &render_signature(kind, &params, &return_type));
        Self {
            hash,
            name: name.to_string(),
            owner,
            kind,
            params,
            return_type,
            generic_params: Vec::new(),
            generic_owner: TypeHash::EMPTY,
            access: Access::Public,
            is_shared: false,
            is_extension: false,
            is_default_extension: false,
        }
    }

    /// A `Function` (or a `Sub` when `return_type` is `Void`).
    pub fn method(owner: TypeHash, name: &str, params: Vec<ParamEntry>, return_type: DataType) -> Self {
        Self::build(owner, name, ProcedureKind::Method, params, return_type)
    }

    /// A `Sub`.
    pub fn sub(owner: TypeHash, name: &str, params: Vec<ParamEntry>) -> Self {
        Self::build(owner, name, ProcedureKind::Method, params, DataType::Void)
    }

    pub fn constructor(owner: TypeHash, params: Vec<ParamEntry>) -> Self {
        Self::build(owner, "New", ProcedureKind::Constructor, params, DataType::Void)
    }

    /// A shared user-defined operator such as `op_Addition`.
    pub fn operator(owner: TypeHash, name: &str, params: Vec<ParamEntry>, return_type: DataType) -> Self {
        let mut entry = Self::build(owner, name, ProcedureKind::Operator, params, return_type);
        entry.is_shared = true;
        entry
    }

    /// A shared user-defined conversion operator from `from` to `to`.
    pub fn conversion(owner: TypeHash, widening: bool, from: DataType, to: DataType) -> Self {
        let name = if widening { "op_Implicit" } else { "op_Explicit" };
        let mut entry = Self::build(
            owner,
            name,
            ProcedureKind::Conversion { widening },
            vec![ParamEntry::new("value", from)],
            to,
        );
        entry.is_shared = true;
        entry
    }

    /// The `GenericParam` owner a generic procedure with this owner, name and
    /// arity uses for its own type parameters.
    pub fn generic_owner_for(owner: TypeHash, name: &str, arity: usize) -> TypeHash {
        TypeHash::from_member(owner, &format!("{name}`{arity}"))
    }

    // === Builder Methods ===

    pub fn with_generic_params(mut self, params: Vec<GenericParamEntry>) -> Self {
        self.generic_owner = Self::generic_owner_for(self.owner, &self.name, params.len());
        self.generic_params = params;
        self
    }

    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Mark as an extension method (implies shared).
    pub fn extension(mut self) -> Self {
        self.is_extension = true;
        self.is_shared = true;
        self
    }

    pub fn default_extension(mut self) -> Self {
        self.is_default_extension = true;
        self.extension()
    }

    // === Query Methods ===

    pub fn is_sub(&self) -> bool {
        self.return_type.is_void()
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    pub fn arity(&self) -> usize {
        self.generic_params.len()
    }

    pub fn has_param_array(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_param_array)
    }

    /// Parameters as seen by instance-call syntax (receiver dropped for extensions).
    pub fn call_params(&self) -> &[ParamEntry] {
        if self.is_extension {
            self.params.get(1..).unwrap_or(&[])
        } else {
            &self.params
        }
    }

    /// Number of parameters that must be supplied.
    pub fn required_count(&self) -> usize {
        self.call_params()
            .iter()
            .filter(|p| !p.is_optional && !p.is_param_array)
            .count()
    }

    /// Placeholder for this procedure's generic parameter `index`.
    pub fn generic_param(&self, index: u32) -> DataType {
        DataType::GenericParam {
            owner: self.generic_owner,
            index,
        }
    }

    /// `name(T1, T2)` rendering used in diagnostics that list candidates.
    pub fn display_with(&self, render: impl Fn(&DataType) -> String) -> String {
        let params: Vec<String> = self
            .call_params()
            .iter()
            .map(|p| {
                let mut s = String::new();
                if p.is_optional {
                    s.push_str("Optional ");
                }
                if p.by_ref {
                    s.push_str("ByRef ");
                }
                if p.is_param_array {
                    s.push_str("ParamArray ");
                }
                s.push_str(&p.name);
                s.push_str(" As ");
                s.push_str(&render(&p.ty));
                s
            })
            .collect();
        let mut out = format!("{}({})", self.name, params.join(", "));
        if !self.is_sub() && self.kind != ProcedureKind::Constructor {
            out.push_str(" As ");
            out.push_str(&render(&self.return_type));
        }
        out
    }
}
