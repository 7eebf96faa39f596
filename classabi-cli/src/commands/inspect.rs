use std::path::Path;

use anyhow::Context;
use classabi::{
    archive::JarSource,
    classfile::{annotation::Annotation, ClassHeader, FieldInfo, MethodInfo},
    metadata::{ClassMetadata, MetadataHeader, METADATA_DESCRIPTOR},
    ClassReader, ClassVisitor, ReadOptions,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct MemberInfo {
    access: String,
    name: String,
    descriptor: String,
    has_code: bool,
}

#[derive(Debug, Serialize)]
struct DeclarationInfo {
    kind: &'static str,
    visibility: String,
    name: String,
    jvm: String,
}

#[derive(Debug, Serialize)]
struct MetadataInfo {
    kind: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_visibility: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nested_classes: Vec<String>,
    declarations: Vec<DeclarationInfo>,
}

#[derive(Debug, Serialize)]
struct ClassInfo {
    name: String,
    version: String,
    access: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    annotations: Vec<String>,
    fields: Vec<MemberInfo>,
    methods: Vec<MemberInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<MetadataInfo>,
}

/// Collects the events the report shows.
#[derive(Default)]
struct Collector {
    header: Option<ClassHeader>,
    annotations: Vec<Annotation>,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
}

impl ClassVisitor for Collector {
    fn visit_header(&mut self, header: ClassHeader) -> classabi::Result<()> {
        self.header = Some(header);
        Ok(())
    }

    fn visit_annotation(&mut self, annotation: Annotation, _visible: bool) -> classabi::Result<()> {
        self.annotations.push(annotation);
        Ok(())
    }

    fn visit_field(&mut self, field: FieldInfo) -> classabi::Result<()> {
        self.fields.push(field);
        Ok(())
    }

    fn visit_method(&mut self, method: MethodInfo) -> classabi::Result<()> {
        self.methods.push(method);
        Ok(())
    }
}

fn flag_names<'a, F>(names: impl Iterator<Item = (&'a str, F)>) -> String {
    names
        .map(|(name, _)| name.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn load_bytes(path: &Path, entry: Option<&str>) -> anyhow::Result<Vec<u8>> {
    let Some(entry) = entry else {
        return std::fs::read(path).with_context(|| format!("failed to read {}", path.display()));
    };

    let source =
        JarSource::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    source
        .entries()
        .with_context(|| format!("failed to read {}", path.display()))?
        .into_iter()
        .find(|candidate| candidate.name == entry)
        .map(|found| found.data)
        .with_context(|| format!("{} has no entry {entry}", path.display()))
}

fn describe_metadata(annotation: &Annotation) -> anyhow::Result<MetadataInfo> {
    let header = MetadataHeader::from_annotation(annotation)?;
    let metadata = ClassMetadata::parse(&header)?;

    let mut info = MetadataInfo {
        kind: metadata.kind().to_string(),
        version: header
            .metadata_version
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join("."),
        class_name: None,
        class_visibility: metadata.class_visibility().map(|v| v.to_string()),
        nested_classes: Vec::new(),
        declarations: Vec::new(),
    };

    let Some(declarations) = metadata.declarations() else {
        return Ok(info);
    };
    if let Some(class) = &declarations.class {
        info.class_name = Some(class.fq_name.clone());
        info.nested_classes = class.nested_classes.iter().map(|n| n.name.clone()).collect();
    }
    for constructor in &declarations.constructors {
        info.declarations.push(DeclarationInfo {
            kind: "constructor",
            visibility: constructor.visibility().to_string(),
            name: "<init>".to_string(),
            jvm: String::new(),
        });
    }
    for function in &declarations.functions {
        info.declarations.push(DeclarationInfo {
            kind: if function.is_inline() { "inline fun" } else { "fun" },
            visibility: function.visibility().to_string(),
            name: function.name.clone(),
            jvm: function.signature(),
        });
    }
    for property in &declarations.properties {
        info.declarations.push(DeclarationInfo {
            kind: if property.is_const() { "const val" } else { "val" },
            visibility: property.visibility().to_string(),
            name: property.name.clone(),
            jvm: property.signature(),
        });
    }
    for alias in &declarations.type_aliases {
        info.declarations.push(DeclarationInfo {
            kind: "typealias",
            visibility: alias.visibility().to_string(),
            name: alias.name.clone(),
            jvm: String::new(),
        });
    }
    Ok(info)
}

pub fn run(path: &Path, entry: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let bytes = load_bytes(path, entry)?;
    let reader = ClassReader::new(&bytes)
        .with_context(|| format!("failed to parse class file: {}", path.display()))?;

    let mut collector = Collector::default();
    reader.accept(&mut collector, ReadOptions::default())?;
    let Some(header) = collector.header else {
        anyhow::bail!("{} has no class header", path.display());
    };

    let metadata = collector
        .annotations
        .iter()
        .find(|annotation| annotation.descriptor == METADATA_DESCRIPTOR)
        .map(describe_metadata)
        .transpose()?;

    let member = |access: String, name: &str, descriptor: &str, has_code: bool| MemberInfo {
        access,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        has_code,
    };
    let info = ClassInfo {
        name: header.name,
        version: format!("{}.{}", header.major_version, header.minor_version),
        access: flag_names(header.access.iter_names()),
        super_name: header.super_name,
        interfaces: header.interfaces,
        annotations: collector
            .annotations
            .iter()
            .map(|annotation| annotation.descriptor.clone())
            .collect(),
        fields: collector
            .fields
            .iter()
            .map(|f| member(flag_names(f.access.iter_names()), &f.name, &f.descriptor, false))
            .collect(),
        methods: collector
            .methods
            .iter()
            .map(|m| {
                member(
                    flag_names(m.access.iter_names()),
                    &m.name,
                    &m.descriptor,
                    m.code.is_some(),
                )
            })
            .collect(),
        metadata,
    };

    print_output(&info, opts, display_class)
}

fn display_class(info: &ClassInfo) {
    println!("class {} ({})", info.name, info.access);
    println!("  version:     {}", info.version);
    if let Some(super_name) = &info.super_name {
        println!("  extends:     {super_name}");
    }
    if !info.interfaces.is_empty() {
        println!("  implements:  {}", info.interfaces.join(", "));
    }
    for annotation in &info.annotations {
        println!("  annotation:  {annotation}");
    }

    for (title, members) in [("Fields", &info.fields), ("Methods", &info.methods)] {
        println!();
        println!("{title} ({}):", members.len());
        let mut table = TabWriter::new(&[
            ("ACCESS", Align::Left),
            ("NAME", Align::Left),
            ("DESCRIPTOR", Align::Left),
            ("CODE", Align::Right),
        ])
        .indent("  ");
        for m in members {
            table.row(vec![
                m.access.clone(),
                m.name.clone(),
                m.descriptor.clone(),
                if m.has_code { "yes" } else { "" }.to_string(),
            ]);
        }
        if !table.is_empty() {
            table.print();
        }
    }

    let Some(metadata) = &info.metadata else {
        return;
    };
    println!();
    println!("Kotlin metadata: {} (version {})", metadata.kind, metadata.version);
    if let (Some(name), Some(visibility)) = (&metadata.class_name, &metadata.class_visibility) {
        println!("  class {name} ({visibility})");
    }
    if !metadata.nested_classes.is_empty() {
        println!("  nested: {}", metadata.nested_classes.join(", "));
    }
    let mut table = TabWriter::new(&[
        ("KIND", Align::Left),
        ("VISIBILITY", Align::Left),
        ("NAME", Align::Left),
        ("JVM", Align::Left),
    ])
    .indent("  ");
    for declaration in &metadata.declarations {
        table.row(vec![
            declaration.kind.to_string(),
            declaration.visibility.clone(),
            declaration.name.clone(),
            declaration.jvm.clone(),
        ]);
    }
    if !table.is_empty() {
        table.print();
    }
}
