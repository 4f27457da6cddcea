//! Derived chunk and embedding metadata.
//!
//! All values are strings because the vector index only accepts flat string
//! metadata; booleans are rendered as `"true"`/`"false"`.

use crate::ast::{MethodDecl, TypeDecl};
use crate::chunk::{Chunk, ChunkKind, ChunkMetadata};

/// Annotation names marking a method as a web route.
pub const ENDPOINT_ANNOTATIONS: [&str; 9] = [
    "RequestMapping",
    "GetMapping",
    "PostMapping",
    "PutMapping",
    "DeleteMapping",
    "GET",
    "POST",
    "PUT",
    "DELETE",
];

/// Returns true when any raw annotation contains `@<name>` for one of the
/// given names.
#[must_use]
pub fn has_annotation(annotations: &[Box<str>], names: &[&str]) -> bool {
    annotations.iter().any(|annotation| {
        names
            .iter()
            .any(|name| annotation.contains(&format!("@{name}")))
    })
}

/// Returns true when the annotations mark a known framework component role.
#[must_use]
pub fn is_spring_component(annotations: &[Box<str>]) -> bool {
    has_annotation(
        annotations,
        &["Controller", "Service", "Repository", "Component", "Entity"],
    )
}

/// Metadata attached to every class-level chunk: component-role flags plus
/// method and field counts.
#[must_use]
pub fn class_chunk_metadata(decl: &TypeDecl, package_name: &str, kind_tag: &str) -> ChunkMetadata {
    let annotations = &decl.annotations;
    let flag = |names: &[&str]| has_annotation(annotations, names).to_string();

    let mut metadata = ChunkMetadata::new();
    metadata.insert("chunkType".to_owned(), kind_tag.to_owned());
    metadata.insert("packageName".to_owned(), package_name.to_owned());
    metadata.insert(
        "isController".to_owned(),
        flag(&["Controller", "RestController"]),
    );
    metadata.insert("isService".to_owned(), flag(&["Service"]));
    metadata.insert("isRepository".to_owned(), flag(&["Repository"]));
    metadata.insert("isComponent".to_owned(), flag(&["Component"]));
    metadata.insert("isEntity".to_owned(), flag(&["Entity"]));
    metadata.insert("isConfiguration".to_owned(), flag(&["Configuration"]));
    metadata.insert("methodCount".to_owned(), decl.methods.len().to_string());
    metadata.insert("fieldCount".to_owned(), decl.fields.len().to_string());
    metadata
}

/// Metadata attached to method-level chunks: visibility, static-ness, return
/// type, arity, and endpoint/transactional flags.
#[must_use]
pub fn method_chunk_metadata(method: &MethodDecl, package_name: &str) -> ChunkMetadata {
    let mut metadata = ChunkMetadata::new();
    metadata.insert("chunkType".to_owned(), "METHOD".to_owned());
    metadata.insert("packageName".to_owned(), package_name.to_owned());
    metadata.insert(
        "isPublic".to_owned(),
        method.modifiers.is_public.to_string(),
    );
    metadata.insert(
        "isStatic".to_owned(),
        method.modifiers.is_static.to_string(),
    );
    metadata.insert("returnType".to_owned(), method.return_type.to_string());
    metadata.insert(
        "parameterCount".to_owned(),
        method.parameters.len().to_string(),
    );
    metadata.insert(
        "isEndpoint".to_owned(),
        has_annotation(&method.annotations, &ENDPOINT_ANNOTATIONS).to_string(),
    );
    metadata.insert(
        "isTransactional".to_owned(),
        has_annotation(&method.annotations, &["Transactional"]).to_string(),
    );
    metadata
}

/// Merge chunk metadata with embedding-level facts for storage alongside the
/// vector.
#[must_use]
pub fn embedding_metadata(chunk: &Chunk) -> ChunkMetadata {
    let mut metadata = chunk.metadata.clone();

    metadata.insert("chunkId".to_owned(), chunk.id.to_string());
    metadata.insert("type".to_owned(), chunk.kind.as_str().to_owned());
    metadata.insert("className".to_owned(), chunk.class_name.to_string());
    metadata.insert("packageName".to_owned(), chunk.package_name.to_string());
    metadata.insert("filePath".to_owned(), chunk.file_path.to_string());
    metadata.insert(
        "contentLength".to_owned(),
        chunk.content.len().to_string(),
    );
    metadata.insert(
        "hasAnnotations".to_owned(),
        (!chunk.annotations.is_empty()).to_string(),
    );
    metadata.insert(
        "annotations".to_owned(),
        chunk
            .annotations
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(","),
    );
    metadata.insert(
        "isSpringComponent".to_owned(),
        is_spring_component(&chunk.annotations).to_string(),
    );

    if chunk.kind == ChunkKind::Method {
        if let Some(method_name) = &chunk.method_name {
            metadata.insert("methodName".to_owned(), method_name.to_string());
            metadata.insert(
                "fullMethodName".to_owned(),
                format!("{}.{}", chunk.class_name, method_name),
            );
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldDecl, Modifiers};
    use crate::primitives::ChunkId;

    fn service_decl() -> TypeDecl {
        TypeDecl {
            name: "UserService".into(),
            annotations: vec!["@Service".into()],
            fields: vec![FieldDecl {
                annotations: vec!["@Autowired".into()],
                text: "private UserRepository repository;".into(),
            }],
            methods: vec![MethodDecl {
                name: "save".into(),
                ..MethodDecl::default()
            }],
            ..TypeDecl::default()
        }
    }

    #[test]
    fn role_flags_match_annotations() {
        let metadata = class_chunk_metadata(&service_decl(), "com.acme", "CLASS_METADATA");

        assert_eq!(metadata.get("isService").map(String::as_str), Some("true"));
        assert_eq!(
            metadata.get("isController").map(String::as_str),
            Some("false")
        );
        assert_eq!(
            metadata.get("isRepository").map(String::as_str),
            Some("false")
        );
        assert_eq!(metadata.get("methodCount").map(String::as_str), Some("1"));
        assert_eq!(metadata.get("fieldCount").map(String::as_str), Some("1"));
        assert_eq!(
            metadata.get("chunkType").map(String::as_str),
            Some("CLASS_METADATA")
        );
    }

    #[test]
    fn rest_controller_does_not_mark_component() {
        let decl = TypeDecl {
            annotations: vec!["@RestController".into()],
            ..TypeDecl::default()
        };
        let metadata = class_chunk_metadata(&decl, "", "CLASS");

        assert_eq!(
            metadata.get("isController").map(String::as_str),
            Some("true")
        );
        assert_eq!(
            metadata.get("isComponent").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn method_metadata_flags_endpoints_and_transactions() {
        let method = MethodDecl {
            name: "listUsers".into(),
            modifiers: Modifiers {
                is_public: true,
                ..Modifiers::default()
            },
            return_type: "List<User>".into(),
            annotations: vec!["@GetMapping(\"/users\")".into()],
            ..MethodDecl::default()
        };
        let metadata = method_chunk_metadata(&method, "com.acme");

        assert_eq!(metadata.get("isEndpoint").map(String::as_str), Some("true"));
        assert_eq!(
            metadata.get("isTransactional").map(String::as_str),
            Some("false")
        );
        assert_eq!(metadata.get("isPublic").map(String::as_str), Some("true"));
        assert_eq!(
            metadata.get("returnType").map(String::as_str),
            Some("List<User>")
        );
        assert_eq!(
            metadata.get("parameterCount").map(String::as_str),
            Some("0")
        );
    }

    #[test]
    fn embedding_metadata_merges_chunk_facts() {
        let chunk = Chunk {
            id: ChunkId::parse("com.acme.UserService.UserService.save.method").unwrap(),
            content: "public void save() {}".into(),
            kind: ChunkKind::Method,
            class_name: "UserService".into(),
            method_name: Some("save".into()),
            package_name: "com.acme".into(),
            file_path: "src/UserService.java".into(),
            annotations: vec!["@Transactional".into()],
            imports: Vec::new(),
            metadata: ChunkMetadata::new(),
        };

        let metadata = embedding_metadata(&chunk);
        assert_eq!(
            metadata.get("chunkId").map(String::as_str),
            Some("com.acme.UserService.UserService.save.method")
        );
        assert_eq!(metadata.get("type").map(String::as_str), Some("METHOD"));
        assert_eq!(
            metadata.get("fullMethodName").map(String::as_str),
            Some("UserService.save")
        );
        assert_eq!(
            metadata.get("annotations").map(String::as_str),
            Some("@Transactional")
        );
        assert_eq!(
            metadata.get("hasAnnotations").map(String::as_str),
            Some("true")
        );
        assert_eq!(metadata.get("contentLength").map(String::as_str), Some("21"));
    }
}
