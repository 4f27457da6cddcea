//! Parsed Java declarations as a closed set of value types.
//!
//! The parser adapter lowers a syntax tree into these records once per file;
//! everything downstream (chunking, metadata derivation) works on plain data
//! and never touches the parser again.

use serde::{Deserialize, Serialize};

/// One successfully parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    /// Declared package, empty when the file has no package declaration.
    pub package_name: Box<str>,
    /// Imported type names in declaration order (without the `import` keyword).
    pub imports: Vec<Box<str>>,
    /// Top-level and nested class/interface declarations, in source order.
    pub types: Vec<TypeDecl>,
}

/// A class or interface declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    /// Simple type name.
    pub name: Box<str>,
    /// True for `interface`, false for `class`.
    pub is_interface: bool,
    /// Declared modifiers.
    pub modifiers: Modifiers,
    /// Generic type parameters, raw text per parameter.
    pub type_parameters: Vec<Box<str>>,
    /// Extended supertypes, raw text per type.
    pub extends: Vec<Box<str>>,
    /// Implemented interfaces, raw text per type.
    pub implements: Vec<Box<str>>,
    /// Raw annotation text including the leading `@`.
    pub annotations: Vec<Box<str>>,
    /// Declared fields in source order.
    pub fields: Vec<FieldDecl>,
    /// Declared methods in source order.
    pub methods: Vec<MethodDecl>,
    /// Full source text of the declaration.
    pub text: Box<str>,
}

impl TypeDecl {
    /// Rebuild the declaration header (modifiers, name, generics, supertypes)
    /// without the body.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        self.modifiers.write_prefix(&mut signature);

        signature.push_str(if self.is_interface {
            "interface "
        } else {
            "class "
        });
        signature.push_str(&self.name);

        if !self.type_parameters.is_empty() {
            signature.push('<');
            signature.push_str(&join(&self.type_parameters, ", "));
            signature.push('>');
        }
        if !self.extends.is_empty() {
            signature.push_str(" extends ");
            signature.push_str(&join(&self.extends, ", "));
        }
        if !self.implements.is_empty() {
            signature.push_str(" implements ");
            signature.push_str(&join(&self.implements, ", "));
        }

        signature
    }
}

/// A method declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDecl {
    /// Method name.
    pub name: Box<str>,
    /// Declared modifiers.
    pub modifiers: Modifiers,
    /// Generic type parameters, raw text per parameter.
    pub type_parameters: Vec<Box<str>>,
    /// Return type as written in source.
    pub return_type: Box<str>,
    /// Declared parameters in order.
    pub parameters: Vec<MethodParam>,
    /// Thrown exception types, raw text per type.
    pub throws: Vec<Box<str>>,
    /// Raw annotation text including the leading `@`.
    pub annotations: Vec<Box<str>>,
    /// Full source text of the declaration including the body.
    pub text: Box<str>,
}

impl MethodDecl {
    /// Rebuild the method header (modifiers, generics, return type, parameters,
    /// throws clause) without the body.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        self.modifiers.write_prefix(&mut signature);

        if !self.type_parameters.is_empty() {
            signature.push('<');
            signature.push_str(&join(&self.type_parameters, ", "));
            signature.push_str("> ");
        }

        signature.push_str(&self.return_type);
        signature.push(' ');
        signature.push_str(&self.name);

        signature.push('(');
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|param| format!("{} {}", param.type_name, param.name))
            .collect();
        signature.push_str(&params.join(", "));
        signature.push(')');

        if !self.throws.is_empty() {
            signature.push_str(" throws ");
            signature.push_str(&join(&self.throws, ", "));
        }

        signature
    }
}

/// A method parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodParam {
    /// Parameter type as written in source.
    pub type_name: Box<str>,
    /// Parameter name.
    pub name: Box<str>,
}

/// A field declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    /// Raw annotation text including the leading `@`.
    pub annotations: Vec<Box<str>>,
    /// Full source text of the declaration.
    pub text: Box<str>,
}

/// Declaration modifiers relevant to signature rebuilding and metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifiers {
    /// `public` modifier present.
    pub is_public: bool,
    /// `private` modifier present.
    pub is_private: bool,
    /// `protected` modifier present.
    pub is_protected: bool,
    /// `static` modifier present.
    pub is_static: bool,
    /// `final` modifier present.
    pub is_final: bool,
    /// `abstract` modifier present.
    pub is_abstract: bool,
    /// `synchronized` modifier present (methods only).
    pub is_synchronized: bool,
}

impl Modifiers {
    fn write_prefix(self, out: &mut String) {
        if self.is_public {
            out.push_str("public ");
        }
        if self.is_private {
            out.push_str("private ");
        }
        if self.is_protected {
            out.push_str("protected ");
        }
        if self.is_static {
            out.push_str("static ");
        }
        if self.is_final {
            out.push_str("final ");
        }
        if self.is_abstract {
            out.push_str("abstract ");
        }
        if self.is_synchronized {
            out.push_str("synchronized ");
        }
    }
}

fn join(parts: &[Box<str>], separator: &str) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(separator)
}
