//! A small XSLT 1.0 interpreter.
//!
//! Covers what feature info stylesheets use in practice: `xsl:template` with
//! `match`/`priority`, `xsl:apply-templates`, `xsl:value-of`, `xsl:for-each`,
//! `xsl:copy-of`, `xsl:if`, `xsl:choose`, `xsl:text`, literal result elements
//! and the built-in template rules. Select expressions use the XPath subset in
//! [`crate::xpath`]. Anything else fails when the stylesheet is compiled, not
//! when it runs.

use crate::document::{XmlElement, XmlNode};
use crate::transform::{TransformError, TreeTransform};
use crate::xml::parse_xml;
use crate::xpath::{Expr, NodeRef, Pattern};

pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

const MAX_DEPTH: usize = 256;

#[derive(Debug)]
enum Instruction {
    Literal {
        name: String,
        attributes: Vec<(String, String)>,
        body: Vec<Instruction>,
    },
    Text(String),
    ValueOf(Expr),
    ApplyTemplates(Option<Expr>),
    ForEach {
        select: Expr,
        body: Vec<Instruction>,
    },
    CopyOf(Expr),
    If {
        test: Expr,
        body: Vec<Instruction>,
    },
    Choose {
        branches: Vec<(Expr, Vec<Instruction>)>,
        otherwise: Vec<Instruction>,
    },
}

#[derive(Debug)]
struct Template {
    pattern: Pattern,
    priority: Option<f64>,
    body: Vec<Instruction>,
}

/// A compiled stylesheet.
#[derive(Debug)]
pub struct Stylesheet {
    templates: Vec<Template>,
}

impl Stylesheet {
    pub fn parse(source: &str) -> Result<Self, TransformError> {
        let root = parse_xml(source).map_err(|e| TransformError::Stylesheet(e.to_string()))?;
        let prefix = xsl_prefix(&root)?;
        let compiler = Compiler { prefix };

        let mut templates = Vec::new();
        for child in root.child_elements() {
            match compiler.xsl_local_name(child) {
                Some("template") => templates.push(compiler.template(child)?),
                Some("output" | "strip-space" | "preserve-space") => {}
                Some(other) => {
                    return Err(TransformError::Unsupported(format!("xsl:{}", other)));
                }
                // Top-level elements from other namespaces are ignored.
                None => {}
            }
        }

        Ok(Self { templates })
    }

    fn apply<'a>(
        &self,
        root: &'a XmlElement,
        node: NodeRef<'a>,
        out: &mut XmlElement,
        depth: usize,
    ) -> Result<(), TransformError> {
        if depth > MAX_DEPTH {
            return Err(TransformError::RecursionLimit(MAX_DEPTH));
        }

        match self.best_template(&node) {
            Some(template) => self.execute(&template.body, root, node, out, depth),
            None => match node {
                NodeRef::Document(_) | NodeRef::Element(_) => {
                    for child in node.children() {
                        self.apply(root, child, out, depth + 1)?;
                    }
                    Ok(())
                }
                NodeRef::Text(text) | NodeRef::Attribute(text) => {
                    out.push_text(text);
                    Ok(())
                }
            },
        }
    }

    /// Highest priority wins; among equals the last template in the
    /// stylesheet wins.
    fn best_template(&self, node: &NodeRef<'_>) -> Option<&Template> {
        let mut best: Option<(f64, &Template)> = None;
        for template in &self.templates {
            let Some(default) = template.pattern.match_priority(node) else {
                continue;
            };
            let priority = template.priority.unwrap_or(default);
            if best.map_or(true, |(current, _)| priority >= current) {
                best = Some((priority, template));
            }
        }
        best.map(|(_, template)| template)
    }

    fn execute<'a>(
        &self,
        body: &[Instruction],
        root: &'a XmlElement,
        node: NodeRef<'a>,
        out: &mut XmlElement,
        depth: usize,
    ) -> Result<(), TransformError> {
        for instruction in body {
            match instruction {
                Instruction::Literal {
                    name,
                    attributes,
                    body,
                } => {
                    let mut element = XmlElement::new(name.clone());
                    element.attributes = attributes.clone();
                    self.execute(body, root, node, &mut element, depth)?;
                    out.push_element(element);
                }
                Instruction::Text(text) => out.push_text(text.clone()),
                Instruction::ValueOf(expr) => out.push_text(expr.string_value(root, node)),
                Instruction::ApplyTemplates(select) => {
                    let nodes = match select {
                        Some(expr) => expr.select(root, node),
                        None => node.children(),
                    };
                    for selected in nodes {
                        self.apply(root, selected, out, depth + 1)?;
                    }
                }
                Instruction::ForEach { select, body } => {
                    for selected in select.select(root, node) {
                        self.execute(body, root, selected, out, depth + 1)?;
                    }
                }
                Instruction::CopyOf(expr) => {
                    for selected in expr.select(root, node) {
                        copy_node(selected, out);
                    }
                }
                Instruction::If { test, body } => {
                    if !test.select(root, node).is_empty() {
                        self.execute(body, root, node, out, depth)?;
                    }
                }
                Instruction::Choose {
                    branches,
                    otherwise,
                } => {
                    let chosen = branches
                        .iter()
                        .find(|(test, _)| !test.select(root, node).is_empty())
                        .map(|(_, body)| body)
                        .unwrap_or(otherwise);
                    self.execute(chosen, root, node, out, depth)?;
                }
            }
        }
        Ok(())
    }
}

impl TreeTransform for Stylesheet {
    fn transform(&self, input: &XmlElement) -> Result<XmlElement, TransformError> {
        let mut out = XmlElement::default();
        self.apply(input, NodeRef::Document(input), &mut out, 0)?;

        let mut roots = Vec::new();
        let mut stray_text = 0;
        for child in out.children {
            match child {
                XmlNode::Element(element) => roots.push(element),
                XmlNode::Text(text) if text.trim().is_empty() => {}
                XmlNode::Text(_) => stray_text += 1,
            }
        }

        match roots.len() {
            0 => Err(TransformError::EmptyResult),
            1 if stray_text == 0 => Ok(roots.remove(0)),
            n => Err(TransformError::MultipleRoots(n + stray_text)),
        }
    }
}

fn copy_node(node: NodeRef<'_>, out: &mut XmlElement) {
    match node {
        NodeRef::Document(element) | NodeRef::Element(element) => {
            out.push_element(element.clone())
        }
        NodeRef::Text(text) | NodeRef::Attribute(text) => out.push_text(text),
    }
}

/// Find the prefix the stylesheet root binds to the XSLT namespace.
fn xsl_prefix(root: &XmlElement) -> Result<String, TransformError> {
    let (prefix, local) = match root.name.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", root.name.as_str()),
    };
    if local != "stylesheet" && local != "transform" {
        return Err(TransformError::Stylesheet(format!(
            "root element <{}> is not an XSLT stylesheet",
            root.name
        )));
    }

    let declaration = if prefix.is_empty() {
        "xmlns".to_string()
    } else {
        format!("xmlns:{}", prefix)
    };
    if root.attribute(&declaration) != Some(XSLT_NAMESPACE) {
        return Err(TransformError::Stylesheet(format!(
            "<{}> is not bound to {}",
            root.name, XSLT_NAMESPACE
        )));
    }
    Ok(prefix.to_string())
}

struct Compiler {
    prefix: String,
}

impl Compiler {
    fn xsl_local_name<'e>(&self, element: &'e XmlElement) -> Option<&'e str> {
        if self.prefix.is_empty() {
            return (!element.name.contains(':')).then_some(element.name.as_str());
        }
        element
            .name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }

    fn template(&self, element: &XmlElement) -> Result<Template, TransformError> {
        let pattern = element
            .attribute("match")
            .ok_or_else(|| TransformError::Unsupported("xsl:template without match".to_string()))?;
        let priority = element
            .attribute("priority")
            .map(|value| {
                value.trim().parse::<f64>().map_err(|_| {
                    TransformError::Stylesheet(format!("invalid template priority '{}'", value))
                })
            })
            .transpose()?;

        Ok(Template {
            pattern: Pattern::parse(pattern)?,
            priority,
            body: self.body(element)?,
        })
    }

    fn body(&self, element: &XmlElement) -> Result<Vec<Instruction>, TransformError> {
        let mut body = Vec::new();
        for child in &element.children {
            match child {
                XmlNode::Text(text) if text.trim().is_empty() => {}
                XmlNode::Text(text) => body.push(Instruction::Text(text.clone())),
                XmlNode::Element(inner) => body.push(self.instruction(inner)?),
            }
        }
        Ok(body)
    }

    fn instruction(&self, element: &XmlElement) -> Result<Instruction, TransformError> {
        let Some(local) = self.xsl_local_name(element) else {
            return Ok(Instruction::Literal {
                name: element.name.clone(),
                attributes: self.literal_attributes(element),
                body: self.body(element)?,
            });
        };

        let instruction = match local {
            "value-of" => Instruction::ValueOf(self.expr(element, "select")?),
            "apply-templates" => Instruction::ApplyTemplates(
                element.attribute("select").map(Expr::parse).transpose()?,
            ),
            "for-each" => Instruction::ForEach {
                select: self.expr(element, "select")?,
                body: self.body(element)?,
            },
            "copy-of" => Instruction::CopyOf(self.expr(element, "select")?),
            "if" => Instruction::If {
                test: self.expr(element, "test")?,
                body: self.body(element)?,
            },
            "choose" => self.choose(element)?,
            "text" => Instruction::Text(element.text_content()),
            other => return Err(TransformError::Unsupported(format!("xsl:{}", other))),
        };
        Ok(instruction)
    }

    fn choose(&self, element: &XmlElement) -> Result<Instruction, TransformError> {
        let mut branches = Vec::new();
        let mut otherwise = Vec::new();
        for child in element.child_elements() {
            match self.xsl_local_name(child) {
                Some("when") => branches.push((self.expr(child, "test")?, self.body(child)?)),
                Some("otherwise") => otherwise = self.body(child)?,
                _ => {
                    return Err(TransformError::Stylesheet(format!(
                        "unexpected <{}> inside xsl:choose",
                        child.name
                    )))
                }
            }
        }
        Ok(Instruction::Choose {
            branches,
            otherwise,
        })
    }

    fn expr(&self, element: &XmlElement, attribute: &str) -> Result<Expr, TransformError> {
        let source = element.attribute(attribute).ok_or_else(|| {
            TransformError::Stylesheet(format!("<{}> requires a {} attribute", element.name, attribute))
        })?;
        Ok(Expr::parse(source)?)
    }

    /// Literal attributes minus the XSLT namespace declaration.
    fn literal_attributes(&self, element: &XmlElement) -> Vec<(String, String)> {
        element
            .attributes
            .iter()
            .filter(|(_, value)| value != XSLT_NAMESPACE)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stylesheet(templates: &str) -> Stylesheet {
        Stylesheet::parse(&format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="{}">{}</xsl:stylesheet>"#,
            XSLT_NAMESPACE, templates
        ))
        .unwrap()
    }

    fn run(sheet: &Stylesheet, input: &str) -> String {
        sheet
            .transform(&parse_xml(input).unwrap())
            .unwrap()
            .serialize()
    }

    #[test]
    fn test_root_template_with_value_of() {
        let sheet = stylesheet(
            r#"
            <xsl:template match="/">
              <baz>
                <foo><xsl:value-of select="/a/b/text()"/></foo>
              </baz>
            </xsl:template>"#,
        );
        assert_eq!(run(&sheet, "<a><b>Bar</b></a>"), "<baz><foo>Bar</foo></baz>");
    }

    #[test]
    fn test_apply_templates_uses_builtin_rules() {
        let sheet = stylesheet(
            r#"
            <xsl:template match="/"><bars><xsl:apply-templates/></bars></xsl:template>
            <xsl:template match="foo"><bar><xsl:value-of select="text()"/></bar></xsl:template>"#,
        );
        assert_eq!(
            run(&sheet, "<baz><foo>Bar1</foo><foo>Bar2</foo></baz>"),
            "<bars><bar>Bar1</bar><bar>Bar2</bar></bars>"
        );
    }

    #[test]
    fn test_priority_and_document_order() {
        let sheet = stylesheet(
            r#"
            <xsl:template match="/"><out><xsl:apply-templates select="/r/*"/></out></xsl:template>
            <xsl:template match="*"><any/></xsl:template>
            <xsl:template match="x"><first/></xsl:template>
            <xsl:template match="x"><second/></xsl:template>
            <xsl:template match="y" priority="-1"><low/></xsl:template>"#,
        );
        assert_eq!(run(&sheet, "<r><x/><y/></r>"), "<out><second/><any/></out>");
    }

    #[test]
    fn test_for_each_if_choose_and_text() {
        let sheet = stylesheet(
            r#"
            <xsl:template match="/">
              <list>
                <xsl:for-each select="//item">
                  <xsl:if test="@id"><id><xsl:value-of select="@id"/></id></xsl:if>
                  <xsl:choose>
                    <xsl:when test="b"><bold/></xsl:when>
                    <xsl:otherwise><xsl:text> plain </xsl:text></xsl:otherwise>
                  </xsl:choose>
                </xsl:for-each>
              </list>
            </xsl:template>"#,
        );
        assert_eq!(
            run(&sheet, r#"<r><item id="1"><b/></item><item/></r>"#),
            "<list><id>1</id><bold/> plain </list>"
        );
    }

    #[test]
    fn test_copy_of_and_literal_attributes() {
        let sheet = stylesheet(
            r#"<xsl:template match="/"><wrap class="fi"><xsl:copy-of select="/r/x"/></wrap></xsl:template>"#,
        );
        assert_eq!(
            run(&sheet, r#"<r><x a="1">t</x></r>"#),
            r#"<wrap class="fi"><x a="1">t</x></wrap>"#
        );
    }

    #[test]
    fn test_result_must_have_one_root() {
        let empty = stylesheet(r#"<xsl:template match="/"/>"#);
        let input = parse_xml("<a/>").unwrap();
        assert!(matches!(empty.transform(&input), Err(TransformError::EmptyResult)));

        let double = stylesheet(r#"<xsl:template match="/"><x/><y/></xsl:template>"#);
        assert!(matches!(
            double.transform(&input),
            Err(TransformError::MultipleRoots(2))
        ));
    }

    #[test]
    fn test_recursion_is_bounded() {
        let sheet = stylesheet(
            r#"<xsl:template match="a"><xsl:apply-templates select="/a"/></xsl:template>"#,
        );
        let input = parse_xml("<a/>").unwrap();
        assert!(matches!(
            sheet.transform(&input),
            Err(TransformError::RecursionLimit(_))
        ));
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            Stylesheet::parse("<stylesheet/>"),
            Err(TransformError::Stylesheet(_))
        ));
        let unsupported = format!(
            r#"<xsl:stylesheet xmlns:xsl="{}"><xsl:template match="/"><xsl:number/></xsl:template></xsl:stylesheet>"#,
            XSLT_NAMESPACE
        );
        assert!(matches!(
            Stylesheet::parse(&unsupported),
            Err(TransformError::Unsupported(_))
        ));
        let bad_select = format!(
            r#"<xsl:stylesheet xmlns:xsl="{}"><xsl:template match="/"><xsl:value-of select="a[1]"/></xsl:template></xsl:stylesheet>"#,
            XSLT_NAMESPACE
        );
        assert!(matches!(
            Stylesheet::parse(&bad_select),
            Err(TransformError::XPath(_))
        ));
    }
}
