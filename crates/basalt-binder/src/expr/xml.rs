//! XML element literals.
//!
//! `<name>text<%= expr %><child/></name>` constructs an `XElement` from the
//! element name and an `Object()` holding its content.

use basalt_core::{ConstantValue, DataType, DiagnosticCode, RuntimeFeatures};
use basalt_symbols::WellKnownType;
use basalt_syntax::{XmlContent, XmlElementExpr};

use crate::binder::{Binder, Result};
use crate::bound::{BoundExpr, BoundKind};
use crate::context::InterpretationContext;
use crate::overload::BoundArgument;

use super::bind_value;
use super::construction::create;
use super::convert::convert_implicit;
use super::init_list::length_constant;

#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn bind_xml<'ast>(
    b: &mut Binder<'_>,
    element: &'ast XmlElementExpr<'ast>,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = element.span;
    let xelement = b
        .table
        .well_known_type(WellKnownType::XElement)
        .filter(|_| b.options.runtime.contains(RuntimeFeatures::XML_LITERALS));
    let Some(xelement) = xelement else {
        b.report_missing_runtime("XML literal", span);
        return Ok(BoundExpr::bad(span));
    };
    bind_element(b, element, &xelement, ctx)
}

fn bind_element<'ast>(
    b: &mut Binder<'_>,
    element: &'ast XmlElementExpr<'ast>,
    xelement: &DataType,
    ctx: &InterpretationContext,
) -> Result<BoundExpr<'ast>> {
    let span = element.span;
    let name = match element.prefix {
        Some(prefix) => {
            if !b.table.is_xml_prefix(prefix.name) {
                b.error(
                    DiagnosticCode::XmlPrefixNotDefined,
                    prefix.span,
                    format!("XML namespace prefix '{}' is not defined.", prefix.name),
                );
                return Ok(BoundExpr::bad(span));
            }
            format!("{}:{}", prefix.name, element.name.name)
        }
        None => element.name.name.to_string(),
    };

    let mut content = Vec::with_capacity(element.content.len());
    let mut ok = true;
    for item in element.content {
        let value = match *item {
            XmlContent::Text(text) => BoundExpr::constant(ConstantValue::string(text), DataType::string(), span),
            XmlContent::Embedded(expr) => bind_value(b, expr, ctx)?,
            XmlContent::Element(child) => bind_element(b, child, xelement, ctx)?,
        };
        let value = convert_implicit(b, value, &DataType::Object, ctx)?;
        ok &= !value.is_bad();
        content.push(value);
    }
    if !ok {
        return Ok(BoundExpr::bad(span));
    }

    let length = length_constant(b, content.len(), span);
    if length.is_bad() {
        return Ok(BoundExpr::bad(span));
    }
    let name = BoundExpr::constant(ConstantValue::string(name), DataType::string(), element.name.span);
    let content = BoundExpr::new(
        BoundKind::ArrayCreation {
            bounds: vec![length],
            elements: content,
        },
        DataType::array(DataType::Object, 1),
        span,
    );
    let args = vec![BoundArgument::positional(name), BoundArgument::positional(content)];
    create(b, xelement, args, span, ctx)
}
