//! Tree-sitter Java parser adapter.
//!
//! Lowers a compilation unit into the flat `ParsedFile` model. Extraction is
//! best-effort: tree-sitter recovers from localized syntax errors, and a file
//! is only rejected when no type declaration can be recovered at all.

use javalens_domain::{FieldDecl, MethodDecl, MethodParam, Modifiers, ParsedFile, TypeDecl};
use javalens_ports::JavaParserPort;
use javalens_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use tree_sitter::{Node, Parser};

/// Tree-sitter based Java parser.
#[derive(Debug, Default)]
pub struct TreeSitterJavaParser;

impl TreeSitterJavaParser {
    /// Create a new parser adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl JavaParserPort for TreeSitterJavaParser {
    fn parse(&self, relative_path: &str, source: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::internal(),
                    format!("failed to load Java grammar: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            ErrorEnvelope::unexpected(
                ErrorCode::internal(),
                "Java parse did not produce a tree",
                ErrorClass::NonRetriable,
            )
            .with_metadata("path", relative_path)
        })?;

        let root = tree.root_node();
        let mut file = ParsedFile::default();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_declaration" => file.package_name = package_name(child, source)?,
                "import_declaration" => file.imports.push(import_text(child, source)?),
                "class_declaration" | "interface_declaration" => {
                    collect_type_decls(child, source, &mut file.types)?;
                },
                _ => {},
            }
        }

        if file.types.is_empty() && root.has_error() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "no type declaration could be recovered from the source",
            )
            .with_metadata("path", relative_path));
        }
        Ok(file)
    }
}

/// Push `node`'s declaration, then any nested type declarations in its body.
fn collect_type_decls(node: Node<'_>, source: &str, out: &mut Vec<TypeDecl>) -> Result<()> {
    out.push(type_decl(node, source)?);
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if matches!(member.kind(), "class_declaration" | "interface_declaration") {
                collect_type_decls(member, source, out)?;
            }
        }
    }
    Ok(())
}

fn type_decl(node: Node<'_>, source: &str) -> Result<TypeDecl> {
    let is_interface = node.kind() == "interface_declaration";
    let name = field_text(node, "name", source)?;
    let (modifiers, annotations) = modifiers_and_annotations(node, source)?;
    let type_parameters = type_parameter_texts(node, source)?;

    let mut extends = Vec::new();
    let mut implements = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "superclass" | "extends_interfaces" => {
                extends.extend(type_list_texts(child, source)?);
            },
            "super_interfaces" => implements.extend(type_list_texts(child, source)?),
            _ => {},
        }
    }

    let mut fields = Vec::new();
    let mut methods = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "field_declaration" => fields.push(field_decl(member, source)?),
                "method_declaration" => methods.push(method_decl(member, source)?),
                _ => {},
            }
        }
    }

    Ok(TypeDecl {
        name,
        is_interface,
        modifiers,
        type_parameters,
        extends,
        implements,
        annotations,
        fields,
        methods,
        text: node_text(node, source)?.into(),
    })
}

fn method_decl(node: Node<'_>, source: &str) -> Result<MethodDecl> {
    let (modifiers, annotations) = modifiers_and_annotations(node, source)?;
    let mut throws = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "throws" {
            throws.extend(type_list_texts(child, source)?);
        }
    }

    Ok(MethodDecl {
        name: field_text(node, "name", source)?,
        modifiers,
        type_parameters: type_parameter_texts(node, source)?,
        return_type: field_text(node, "type", source)?,
        parameters: method_params(node, source)?,
        throws,
        annotations,
        text: node_text(node, source)?.into(),
    })
}

fn method_params(node: Node<'_>, source: &str) -> Result<Vec<MethodParam>> {
    let Some(parameters) = node.child_by_field_name("parameters") else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    let mut cursor = parameters.walk();
    for parameter in parameters.named_children(&mut cursor) {
        match parameter.kind() {
            "formal_parameter" | "spread_parameter" => {
                if let (Some(type_node), Some(name_node)) = (
                    parameter.child_by_field_name("type"),
                    parameter.child_by_field_name("name"),
                ) {
                    out.push(MethodParam {
                        type_name: node_text(type_node, source)?.into(),
                        name: node_text(name_node, source)?.into(),
                    });
                } else if let Some(param) = split_parameter_text(node_text(parameter, source)?) {
                    out.push(param);
                }
            },
            _ => {},
        }
    }
    Ok(out)
}

/// Fallback split for parameters the grammar does not expose as fields
/// (varargs): everything up to the last token is the type.
fn split_parameter_text(text: &str) -> Option<MethodParam> {
    let trimmed = text.trim();
    let (type_name, name) = trimmed.rsplit_once(char::is_whitespace)?;
    Some(MethodParam {
        type_name: type_name.trim().into(),
        name: name.trim().into(),
    })
}

fn field_decl(node: Node<'_>, source: &str) -> Result<FieldDecl> {
    let (_, annotations) = modifiers_and_annotations(node, source)?;
    Ok(FieldDecl {
        annotations,
        text: node_text(node, source)?.into(),
    })
}

fn modifiers_and_annotations(node: Node<'_>, source: &str) -> Result<(Modifiers, Vec<Box<str>>)> {
    let mut modifiers = Modifiers::default();
    let mut annotations = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "modifiers" {
            continue;
        }
        let mut inner = child.walk();
        for item in child.children(&mut inner) {
            match item.kind() {
                "public" => modifiers.is_public = true,
                "private" => modifiers.is_private = true,
                "protected" => modifiers.is_protected = true,
                "static" => modifiers.is_static = true,
                "final" => modifiers.is_final = true,
                "abstract" => modifiers.is_abstract = true,
                "synchronized" => modifiers.is_synchronized = true,
                "marker_annotation" | "annotation" => {
                    annotations.push(node_text(item, source)?.into());
                },
                _ => {},
            }
        }
    }
    Ok((modifiers, annotations))
}

fn type_parameter_texts(node: Node<'_>, source: &str) -> Result<Vec<Box<str>>> {
    let Some(parameters) = node.child_by_field_name("type_parameters") else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    let mut cursor = parameters.walk();
    for parameter in parameters.named_children(&mut cursor) {
        out.push(node_text(parameter, source)?.into());
    }
    Ok(out)
}

/// Texts of the types under a `superclass`, `super_interfaces`,
/// `extends_interfaces`, or `throws` node.
fn type_list_texts(node: Node<'_>, source: &str) -> Result<Vec<Box<str>>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "type_list" {
            let mut inner = child.walk();
            for entry in child.named_children(&mut inner) {
                out.push(node_text(entry, source)?.into());
            }
        } else {
            out.push(node_text(child, source)?.into());
        }
    }
    Ok(out)
}

fn package_name(node: Node<'_>, source: &str) -> Result<Box<str>> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "scoped_identifier" | "identifier") {
            return Ok(node_text(child, source)?.into());
        }
    }
    Ok("".into())
}

fn import_text(node: Node<'_>, source: &str) -> Result<Box<str>> {
    let text = node_text(node, source)?;
    let text = text
        .trim()
        .trim_start_matches("import")
        .trim_end_matches(';')
        .trim();
    Ok(text.into())
}

fn field_text(node: Node<'_>, field: &str, source: &str) -> Result<Box<str>> {
    match node.child_by_field_name(field) {
        Some(child) => Ok(node_text(child, source)?.into()),
        None => Ok("".into()),
    }
}

fn node_text<'a>(node: Node<'_>, source: &'a str) -> Result<&'a str> {
    node.utf8_text(source.as_bytes()).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("source slice is not valid UTF-8: {error}"),
            ErrorClass::NonRetriable,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLLER: &str = r#"package com.acme.web;

import org.springframework.web.bind.annotation.GetMapping;
import org.springframework.web.bind.annotation.RestController;
import com.acme.model.User;

@RestController
public class UserController extends BaseController implements Auditable {

    @Autowired
    private UserService userService;

    @GetMapping("/users/{id}")
    public User findUser(Long id) throws NotFoundException {
        return userService.findById(id);
    }

    private static String format(String prefix, String... parts) {
        return prefix;
    }
}
"#;

    #[test]
    fn parses_package_and_imports() -> Result<()> {
        let parsed = TreeSitterJavaParser::new().parse("com/acme/web/UserController.java", CONTROLLER)?;
        assert_eq!(parsed.package_name.as_ref(), "com.acme.web");
        assert_eq!(
            parsed.imports,
            vec![
                Box::from("org.springframework.web.bind.annotation.GetMapping"),
                Box::from("org.springframework.web.bind.annotation.RestController"),
                Box::from("com.acme.model.User"),
            ]
        );
        Ok(())
    }

    #[test]
    fn parses_class_declaration_shape() -> Result<()> {
        let parsed = TreeSitterJavaParser::new().parse("UserController.java", CONTROLLER)?;
        assert_eq!(parsed.types.len(), 1);

        let class = &parsed.types[0];
        assert_eq!(class.name.as_ref(), "UserController");
        assert!(!class.is_interface);
        assert!(class.modifiers.is_public);
        assert_eq!(class.annotations, vec![Box::from("@RestController")]);
        assert_eq!(class.extends, vec![Box::from("BaseController")]);
        assert_eq!(class.implements, vec![Box::from("Auditable")]);
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].annotations, vec![Box::from("@Autowired")]);
        Ok(())
    }

    #[test]
    fn parses_methods_with_throws_and_varargs() -> Result<()> {
        let parsed = TreeSitterJavaParser::new().parse("UserController.java", CONTROLLER)?;
        let class = &parsed.types[0];
        assert_eq!(class.methods.len(), 2);

        let find_user = &class.methods[0];
        assert_eq!(find_user.name.as_ref(), "findUser");
        assert_eq!(find_user.return_type.as_ref(), "User");
        assert_eq!(find_user.throws, vec![Box::from("NotFoundException")]);
        assert_eq!(find_user.parameters.len(), 1);
        assert_eq!(find_user.parameters[0].type_name.as_ref(), "Long");
        assert_eq!(find_user.parameters[0].name.as_ref(), "id");
        assert_eq!(
            find_user.annotations,
            vec![Box::from("@GetMapping(\"/users/{id}\")")]
        );

        let format = &class.methods[1];
        assert!(format.modifiers.is_private);
        assert!(format.modifiers.is_static);
        assert_eq!(format.parameters.len(), 2);
        assert_eq!(format.parameters[1].name.as_ref(), "parts");
        Ok(())
    }

    #[test]
    fn parses_interface_with_generics() -> Result<()> {
        let source = "public interface Repository<T, ID> extends CrudRepository<T, ID> {\n    T findOne(ID id);\n}\n";
        let parsed = TreeSitterJavaParser::new().parse("Repository.java", source)?;
        assert_eq!(parsed.types.len(), 1);

        let interface = &parsed.types[0];
        assert!(interface.is_interface);
        assert_eq!(interface.name.as_ref(), "Repository");
        assert_eq!(
            interface.type_parameters,
            vec![Box::from("T"), Box::from("ID")]
        );
        assert_eq!(interface.extends, vec![Box::from("CrudRepository<T, ID>")]);
        assert_eq!(interface.methods.len(), 1);
        assert_eq!(interface.methods[0].name.as_ref(), "findOne");
        Ok(())
    }

    #[test]
    fn nested_types_follow_their_outer_type() -> Result<()> {
        let source = "public class Outer {\n    public void run() {}\n    static class Inner {\n        void helper() {}\n    }\n}\n";
        let parsed = TreeSitterJavaParser::new().parse("Outer.java", source)?;
        assert_eq!(parsed.types.len(), 2);
        assert_eq!(parsed.types[0].name.as_ref(), "Outer");
        assert_eq!(parsed.types[1].name.as_ref(), "Inner");
        assert!(parsed.types[1].modifiers.is_static);
        Ok(())
    }

    #[test]
    fn file_without_recoverable_types_is_rejected() {
        let error = TreeSitterJavaParser::new()
            .parse("Broken.java", "public class {{{{")
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::invalid_input());
        assert_eq!(
            error.metadata.get("path").map(String::as_str),
            Some("Broken.java")
        );
    }

    #[test]
    fn file_without_package_has_empty_package_name() -> Result<()> {
        let parsed = TreeSitterJavaParser::new().parse("A.java", "class A {}")?;
        assert!(parsed.package_name.is_empty());
        assert_eq!(parsed.types.len(), 1);
        Ok(())
    }
}
