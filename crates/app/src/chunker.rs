//! Splits parsed Java files into retrieval-sized chunks.
//!
//! Every type declaration always yields a metadata chunk (an overview of
//! signatures and annotations). What else it yields depends on the strategy
//! and the serialized class size: small classes become one chunk, oversized
//! classes are split into method groups, and groups that are still too large
//! fall back to single-method chunks.

use javalens_config::ChunkingConfig;
use javalens_domain::{
    class_chunk_metadata, derive_chunk_id, method_chunk_metadata, Chunk, ChunkIdInput, ChunkKind,
    ChunkingStrategy, ChunkMetadata, MethodDecl, MethodGroupKind, ParsedFile, TypeDecl,
};

/// Import substrings that survive the context-prefix filter.
const IMPORTANT_IMPORTS: [&str; 6] = [
    "springframework",
    "javax.persistence",
    "jakarta.persistence",
    "javax.ws.rs",
    "javax.validation",
    "jakarta.validation",
];

/// Annotation names copied into group and method chunks as class context.
const IMPORTANT_ANNOTATIONS: [&str; 8] = [
    "RestController",
    "Controller",
    "Service",
    "Repository",
    "Entity",
    "Component",
    "Configuration",
    "Path",
];

/// Field annotation names that make a field relevant to a method group.
const GROUP_FIELD_ANNOTATIONS: [&str; 6] =
    ["Autowired", "Column", "JoinColumn", "Id", "Value", "Qualifier"];

/// Method annotation names (besides `*Mapping`) that mark a web route.
const ROUTE_ANNOTATIONS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "Path"];

/// Chunker knobs resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerSettings {
    /// Splitting strategy for oversized classes.
    pub strategy: ChunkingStrategy,
    /// Maximum characters per chunk before splitting further.
    pub max_chunk_chars: usize,
}

impl ChunkerSettings {
    /// Resolve settings from the validated chunking section.
    #[must_use]
    pub fn from_chunking_config(config: &ChunkingConfig) -> Self {
        Self {
            strategy: config.strategy,
            max_chunk_chars: config.max_chunk_chars as usize,
        }
    }
}

impl Default for ChunkerSettings {
    fn default() -> Self {
        Self::from_chunking_config(&ChunkingConfig::default())
    }
}

/// Split one parsed file into chunks.
///
/// Per-declaration failures (an id that cannot be derived) are logged and
/// skipped; the remaining chunks of the file are still returned.
#[must_use]
pub fn chunk_file(settings: ChunkerSettings, parsed: &ParsedFile, file_path: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for decl in &parsed.types {
        push_chunk(
            &mut chunks,
            class_metadata_chunk(parsed, decl, file_path),
            file_path,
        );

        let full_size = decl.text.chars().count();
        if settings.strategy == ChunkingStrategy::ClassOnly || full_size <= settings.max_chunk_chars
        {
            push_chunk(
                &mut chunks,
                full_class_chunk(parsed, decl, file_path),
                file_path,
            );
        } else if settings.strategy == ChunkingStrategy::MethodOnly {
            for method in &decl.methods {
                push_chunk(
                    &mut chunks,
                    method_chunk(parsed, decl, method, file_path),
                    file_path,
                );
            }
        } else {
            chunk_oversized_class(settings, &mut chunks, parsed, decl, file_path);
        }
    }

    tracing::debug!(
        file_path,
        chunks = chunks.len(),
        strategy = %settings.strategy,
        "chunked file"
    );
    chunks
}

fn push_chunk(
    chunks: &mut Vec<Chunk>,
    candidate: Result<Chunk, javalens_domain::PrimitiveError>,
    file_path: &str,
) {
    match candidate {
        Ok(chunk) => chunks.push(chunk),
        Err(error) => {
            tracing::warn!(file_path, %error, "skipping chunk with underivable id");
        },
    }
}

fn chunk_oversized_class(
    settings: ChunkerSettings,
    chunks: &mut Vec<Chunk>,
    parsed: &ParsedFile,
    decl: &TypeDecl,
    file_path: &str,
) {
    let groups = group_related_methods(decl);

    for kind in MethodGroupKind::ALL {
        let members = &groups[group_index(kind)];
        if members.is_empty() {
            continue;
        }

        let group_code = build_group_code(parsed, decl, kind, members);
        if group_code.chars().count() <= settings.max_chunk_chars {
            push_chunk(
                chunks,
                method_group_chunk(parsed, decl, kind, members, group_code, file_path),
                file_path,
            );
        } else {
            for method in members {
                push_chunk(
                    chunks,
                    method_chunk(parsed, decl, method, file_path),
                    file_path,
                );
            }
        }
    }

    if !decl.fields.is_empty() {
        push_chunk(chunks, fields_chunk(parsed, decl, file_path), file_path);
    }
}

/// Bucket methods by retrieval intent.
///
/// Route annotations win over naming rules; `get`/`set`/`is` prefixes beat
/// the persistence-verb check; everything else is business logic.
fn group_related_methods(decl: &TypeDecl) -> [Vec<&MethodDecl>; 4] {
    let mut groups: [Vec<&MethodDecl>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];

    for method in &decl.methods {
        let kind = classify_method(method);
        groups[group_index(kind)].push(method);
    }

    groups
}

const fn group_index(kind: MethodGroupKind) -> usize {
    match kind {
        MethodGroupKind::RestEndpoints => 0,
        MethodGroupKind::BusinessLogic => 1,
        MethodGroupKind::CrudOperations => 2,
        MethodGroupKind::Accessors => 3,
    }
}

fn classify_method(method: &MethodDecl) -> MethodGroupKind {
    if has_route_annotation(method) {
        return MethodGroupKind::RestEndpoints;
    }

    let name = method.name.to_lowercase();
    if name.starts_with("get") || name.starts_with("set") || name.starts_with("is") {
        return MethodGroupKind::Accessors;
    }
    if ["save", "delete", "create", "update", "find", "search"]
        .iter()
        .any(|verb| name.contains(verb))
    {
        return MethodGroupKind::CrudOperations;
    }

    MethodGroupKind::BusinessLogic
}

fn has_route_annotation(method: &MethodDecl) -> bool {
    method.annotations.iter().any(|annotation| {
        let name = annotation_name(annotation);
        name.contains("Mapping") || ROUTE_ANNOTATIONS.contains(&name)
    })
}

/// Simple name of a raw annotation: `@GetMapping("/users")` -> `GetMapping`.
fn annotation_name(annotation: &str) -> &str {
    let stripped = annotation.trim_start().trim_start_matches('@');
    stripped
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or(stripped)
}

fn is_important_import(import: &str) -> bool {
    IMPORTANT_IMPORTS
        .iter()
        .any(|needle| import.contains(needle))
}

fn is_important_annotation(annotation: &str) -> bool {
    IMPORTANT_ANNOTATIONS.contains(&annotation_name(annotation))
}

fn is_relevant_for_group(annotations: &[Box<str>]) -> bool {
    annotations
        .iter()
        .any(|annotation| GROUP_FIELD_ANNOTATIONS.contains(&annotation_name(annotation)))
}

/// Package line plus filtered imports, shared by class-level chunk bodies.
fn context_prefix(parsed: &ParsedFile) -> String {
    let mut prefix = String::new();

    if !parsed.package_name.is_empty() {
        prefix.push_str("package ");
        prefix.push_str(&parsed.package_name);
        prefix.push_str(";\n\n");
    }

    for import in parsed.imports.iter().filter(|i| is_important_import(i)) {
        prefix.push_str("import ");
        prefix.push_str(import);
        prefix.push_str(";\n");
    }
    if !parsed.imports.is_empty() {
        prefix.push('\n');
    }

    prefix
}

fn class_metadata_chunk(
    parsed: &ParsedFile,
    decl: &TypeDecl,
    file_path: &str,
) -> Result<Chunk, javalens_domain::PrimitiveError> {
    let mut content = context_prefix(parsed);

    for annotation in &decl.annotations {
        content.push_str(annotation);
        content.push('\n');
    }

    content.push_str(&decl.signature());
    content.push_str(" {\n");

    for method in &decl.methods {
        for annotation in &method.annotations {
            content.push_str("    ");
            content.push_str(annotation);
            content.push('\n');
        }
        content.push_str("    ");
        content.push_str(&method.signature());
        content.push_str(";\n");
    }
    content.push_str("}\n");

    let kind = ChunkKind::ClassMetadata;
    build_chunk(BuildChunk {
        parsed,
        decl,
        kind,
        content,
        file_path,
        method: None,
        metadata: class_chunk_metadata(decl, &parsed.package_name, kind.as_str()),
    })
}

fn full_class_chunk(
    parsed: &ParsedFile,
    decl: &TypeDecl,
    file_path: &str,
) -> Result<Chunk, javalens_domain::PrimitiveError> {
    let mut content = context_prefix(parsed);
    content.push_str(&decl.text);

    let kind = if decl.is_interface {
        ChunkKind::Interface
    } else {
        ChunkKind::Class
    };
    build_chunk(BuildChunk {
        parsed,
        decl,
        kind,
        content,
        file_path,
        method: None,
        metadata: class_chunk_metadata(decl, &parsed.package_name, "FULL_CLASS"),
    })
}

fn build_group_code(
    parsed: &ParsedFile,
    decl: &TypeDecl,
    kind: MethodGroupKind,
    members: &[&MethodDecl],
) -> String {
    let mut code = context_prefix(parsed);

    code.push_str("// Class: ");
    code.push_str(&decl.name);
    code.push('\n');
    code.push_str("// Group: ");
    code.push_str(kind.as_str());
    code.push_str("\n\n");

    for annotation in decl
        .annotations
        .iter()
        .filter(|a| is_important_annotation(a))
    {
        code.push_str(annotation);
        code.push('\n');
    }

    code.push_str("public class ");
    code.push_str(&decl.name);
    code.push_str(" {\n\n");

    for field in decl
        .fields
        .iter()
        .filter(|field| is_relevant_for_group(&field.annotations))
    {
        code.push_str("    ");
        code.push_str(&field.text);
        code.push('\n');
    }
    if !decl.fields.is_empty() {
        code.push('\n');
    }

    for method in members {
        code.push_str("    ");
        code.push_str(&method.text);
        code.push_str("\n\n");
    }
    code.push_str("}\n");

    code
}

fn method_group_chunk(
    parsed: &ParsedFile,
    decl: &TypeDecl,
    kind: MethodGroupKind,
    members: &[&MethodDecl],
    content: String,
    file_path: &str,
) -> Result<Chunk, javalens_domain::PrimitiveError> {
    let mut metadata = class_chunk_metadata(decl, &parsed.package_name, kind.as_str());
    metadata.insert("methodCount".to_owned(), members.len().to_string());
    metadata.insert(
        "methodNames".to_owned(),
        members
            .iter()
            .map(|method| method.name.as_ref())
            .collect::<Vec<&str>>()
            .join(","),
    );

    build_chunk(BuildChunk {
        parsed,
        decl,
        kind: ChunkKind::Group(kind),
        content,
        file_path,
        method: None,
        metadata,
    })
}

fn method_chunk(
    parsed: &ParsedFile,
    decl: &TypeDecl,
    method: &MethodDecl,
    file_path: &str,
) -> Result<Chunk, javalens_domain::PrimitiveError> {
    let mut content = String::new();
    content.push_str("// Class: ");
    content.push_str(&decl.name);
    content.push('\n');
    content.push_str("// Package: ");
    content.push_str(&parsed.package_name);
    content.push_str("\n\n");

    for annotation in decl
        .annotations
        .iter()
        .filter(|a| is_important_annotation(a))
    {
        content.push_str("// Class annotation: ");
        content.push_str(annotation);
        content.push('\n');
    }
    if !decl.annotations.is_empty() {
        content.push('\n');
    }

    content.push_str(&method.text);

    build_chunk(BuildChunk {
        parsed,
        decl,
        kind: ChunkKind::Method,
        content,
        file_path,
        method: Some(method),
        metadata: method_chunk_metadata(method, &parsed.package_name),
    })
}

fn fields_chunk(
    parsed: &ParsedFile,
    decl: &TypeDecl,
    file_path: &str,
) -> Result<Chunk, javalens_domain::PrimitiveError> {
    let mut content = String::new();
    content.push_str("// Class: ");
    content.push_str(&decl.name);
    content.push('\n');
    content.push_str("// Package: ");
    content.push_str(&parsed.package_name);
    content.push('\n');
    content.push_str("// Fields and Properties\n\n");

    for field in &decl.fields {
        content.push_str(&field.text);
        content.push('\n');
    }

    let kind = ChunkKind::Fields;
    build_chunk(BuildChunk {
        parsed,
        decl,
        kind,
        content,
        file_path,
        method: None,
        metadata: class_chunk_metadata(decl, &parsed.package_name, kind.as_str()),
    })
}

struct BuildChunk<'a> {
    parsed: &'a ParsedFile,
    decl: &'a TypeDecl,
    kind: ChunkKind,
    content: String,
    file_path: &'a str,
    method: Option<&'a MethodDecl>,
    metadata: ChunkMetadata,
}

fn build_chunk(input: BuildChunk<'_>) -> Result<Chunk, javalens_domain::PrimitiveError> {
    let id = derive_chunk_id(&ChunkIdInput {
        relative_path: input.file_path,
        class_name: &input.decl.name,
        method_name: input.method.map(|method| method.name.as_ref()),
        kind_key: input.kind.id_key(),
    })?;

    let annotations = input.method.map_or_else(
        || input.decl.annotations.clone(),
        |method| method.annotations.clone(),
    );

    Ok(Chunk {
        id,
        content: input.content.into(),
        kind: input.kind,
        class_name: input.decl.name.clone(),
        method_name: input.method.map(|method| method.name.clone()),
        package_name: input.parsed.package_name.clone(),
        file_path: input.file_path.into(),
        annotations,
        imports: input.parsed.imports.clone(),
        metadata: input.metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use javalens_domain::{FieldDecl, MethodParam, Modifiers};

    fn method(name: &str, annotations: &[&str], body_chars: usize) -> MethodDecl {
        let body = "x".repeat(body_chars);
        MethodDecl {
            name: name.into(),
            modifiers: Modifiers {
                is_public: true,
                ..Modifiers::default()
            },
            return_type: "void".into(),
            annotations: annotations.iter().map(|a| Box::from(*a)).collect(),
            text: format!("public void {name}() {{ {body} }}").into(),
            ..MethodDecl::default()
        }
    }

    fn parsed_with(decl: TypeDecl) -> ParsedFile {
        ParsedFile {
            package_name: "com.acme.users".into(),
            imports: vec![
                "org.springframework.web.bind.annotation.GetMapping".into(),
                "java.util.List".into(),
            ],
            types: vec![decl],
        }
    }

    fn small_service() -> ParsedFile {
        parsed_with(TypeDecl {
            name: "UserService".into(),
            modifiers: Modifiers {
                is_public: true,
                ..Modifiers::default()
            },
            annotations: vec!["@Service".into()],
            methods: vec![method("save", &[], 40)],
            text: "public class UserService { public void save() { } }".into(),
            ..TypeDecl::default()
        })
    }

    #[test]
    fn small_class_yields_metadata_and_full_class_chunks() {
        let parsed = small_service();
        let chunks = chunk_file(
            ChunkerSettings::default(),
            &parsed,
            "src/main/java/com/acme/users/UserService.java",
        );

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, ChunkKind::ClassMetadata);
        assert_eq!(chunks[1].kind, ChunkKind::Class);
        assert_eq!(
            chunks[1].id.as_str(),
            "src.main.java.com.acme.users.UserService.UserService.class"
        );
        assert!(chunks[1].content.starts_with("package com.acme.users;\n\n"));
        assert!(chunks[1]
            .content
            .contains("import org.springframework.web.bind.annotation.GetMapping;\n"));
        assert!(!chunks[1].content.contains("java.util.List"));
    }

    #[test]
    fn metadata_chunk_contains_signatures_not_bodies() {
        let parsed = small_service();
        let chunks = chunk_file(ChunkerSettings::default(), &parsed, "UserService.java");

        let metadata = &chunks[0];
        assert!(metadata.content.contains("public class UserService {\n"));
        assert!(metadata.content.contains("    public void save();\n"));
        assert!(!metadata.content.contains("{ x"));
        assert_eq!(
            metadata.metadata.get("isService").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn oversized_class_splits_into_groups_in_priority_order() {
        let decl = TypeDecl {
            name: "UserController".into(),
            annotations: vec!["@RestController".into()],
            fields: vec![FieldDecl {
                annotations: vec!["@Autowired".into()],
                text: "private UserService service;".into(),
            }],
            methods: vec![
                method("getName", &[], 200),
                method("validateInput", &[], 200),
                method("listUsers", &["@GetMapping(\"/users\")"], 200),
                method("findByEmail", &[], 200),
            ],
            text: "x".repeat(4_000).into(),
            ..TypeDecl::default()
        };
        let parsed = parsed_with(decl);

        let chunks = chunk_file(ChunkerSettings::default(), &parsed, "UserController.java");

        let kinds: Vec<ChunkKind> = chunks.iter().map(|chunk| chunk.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChunkKind::ClassMetadata,
                ChunkKind::Group(MethodGroupKind::RestEndpoints),
                ChunkKind::Group(MethodGroupKind::BusinessLogic),
                ChunkKind::Group(MethodGroupKind::CrudOperations),
                ChunkKind::Group(MethodGroupKind::Accessors),
                ChunkKind::Fields,
            ]
        );

        let endpoints = &chunks[1];
        assert!(endpoints.content.contains("// Class: UserController\n"));
        assert!(endpoints.content.contains("// Group: REST_ENDPOINTS\n\n"));
        assert!(endpoints.content.contains("@RestController\n"));
        assert!(endpoints.content.contains("private UserService service;"));
        assert!(endpoints.content.contains("listUsers"));
        assert_eq!(
            endpoints.metadata.get("methodNames").map(String::as_str),
            Some("listUsers")
        );
        assert_eq!(
            endpoints.metadata.get("methodCount").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn oversized_group_falls_back_to_method_chunks() {
        let decl = TypeDecl {
            name: "ReportEngine".into(),
            annotations: vec!["@Service".into()],
            methods: vec![
                method("renderSummary", &[], 2_000),
                method("renderDetails", &[], 2_000),
            ],
            text: "x".repeat(5_000).into(),
            ..TypeDecl::default()
        };
        let parsed = parsed_with(decl);

        let chunks = chunk_file(ChunkerSettings::default(), &parsed, "ReportEngine.java");

        let methods: Vec<&Chunk> = chunks
            .iter()
            .filter(|chunk| chunk.kind == ChunkKind::Method)
            .collect();
        assert_eq!(methods.len(), 2);
        assert!(methods[0].content.contains("// Class: ReportEngine\n"));
        assert!(methods[0]
            .content
            .contains("// Class annotation: @Service\n"));
        assert_eq!(methods[0].method_name.as_deref(), Some("renderSummary"));
        assert_eq!(
            methods[0].metadata.get("chunkType").map(String::as_str),
            Some("METHOD")
        );
    }

    #[test]
    fn method_only_strategy_skips_grouping() {
        let parsed = parsed_with(TypeDecl {
            name: "UserService".into(),
            methods: vec![method("save", &[], 40), method("load", &[], 40)],
            text: "x".repeat(4_000).into(),
            ..TypeDecl::default()
        });
        let settings = ChunkerSettings {
            strategy: ChunkingStrategy::MethodOnly,
            max_chunk_chars: 3_000,
        };

        let chunks = chunk_file(settings, &parsed, "UserService.java");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].kind, ChunkKind::ClassMetadata);
        assert_eq!(chunks[1].kind, ChunkKind::Method);
        assert_eq!(chunks[1].id.as_str(), "UserService.UserService.save.method");
        assert_eq!(chunks[2].id.as_str(), "UserService.UserService.load.method");
    }

    #[test]
    fn class_only_strategy_never_splits() {
        let decl = TypeDecl {
            name: "Monolith".into(),
            methods: vec![method("run", &[], 6_000)],
            text: "x".repeat(7_000).into(),
            ..TypeDecl::default()
        };
        let parsed = parsed_with(decl);
        let settings = ChunkerSettings {
            strategy: ChunkingStrategy::ClassOnly,
            max_chunk_chars: 3_000,
        };

        let chunks = chunk_file(settings, &parsed, "Monolith.java");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].kind, ChunkKind::Class);
    }

    #[test]
    fn interface_chunk_keeps_interface_kind() {
        let parsed = parsed_with(TypeDecl {
            name: "UserRepository".into(),
            is_interface: true,
            text: "public interface UserRepository { }".into(),
            ..TypeDecl::default()
        });

        let chunks = chunk_file(ChunkerSettings::default(), &parsed, "UserRepository.java");

        assert_eq!(chunks[1].kind, ChunkKind::Interface);
        assert_eq!(
            chunks[1].id.as_str(),
            "UserRepository.UserRepository.class"
        );
    }

    #[test]
    fn route_detection_beats_accessor_naming() {
        let routed = method("getUsers", &["@GetMapping(\"/users\")"], 10);
        assert_eq!(classify_method(&routed), MethodGroupKind::RestEndpoints);

        let accessor = method("getUsers", &[], 10);
        assert_eq!(classify_method(&accessor), MethodGroupKind::Accessors);

        let crud = method("performSearch", &[], 10);
        assert_eq!(classify_method(&crud), MethodGroupKind::CrudOperations);

        let other = method("recalculate", &[], 10);
        assert_eq!(classify_method(&other), MethodGroupKind::BusinessLogic);

        let jaxrs = method("remove", &["@DELETE"], 10);
        assert_eq!(classify_method(&jaxrs), MethodGroupKind::RestEndpoints);
    }

    #[test]
    fn rechunking_is_deterministic() {
        let parsed = small_service();
        let first = chunk_file(ChunkerSettings::default(), &parsed, "UserService.java");
        let second = chunk_file(ChunkerSettings::default(), &parsed, "UserService.java");
        assert_eq!(first, second);
    }

    proptest::proptest! {
        #[test]
        fn adaptive_group_chunks_respect_the_size_bound(
            body_chars in 1usize..2_000,
            methods in 1usize..8,
        ) {
            let decl = TypeDecl {
                name: "Generated".into(),
                methods: (0..methods)
                    .map(|i| method(&format!("compute{i}"), &[], body_chars))
                    .collect(),
                text: "x".repeat(4_000).into(),
                ..TypeDecl::default()
            };
            let parsed = parsed_with(decl);
            let settings = ChunkerSettings::default();

            let chunks = chunk_file(settings, &parsed, "Generated.java");
            for chunk in chunks {
                if let ChunkKind::Group(_) = chunk.kind {
                    proptest::prop_assert!(chunk.content_len() <= settings.max_chunk_chars);
                }
            }
        }
    }
}
