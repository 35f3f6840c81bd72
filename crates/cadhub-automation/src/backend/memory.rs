//! In-memory automation backend
//!
//! Holds a serializable snapshot of an application session (documents,
//! products, parameters, bodies). Used by the test suite and by the command
//! line driver, which loads and saves sessions as RON files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::traits::{
    AutomationError, AutomationResult, AutomationValue, BodyHandle, CadAutomation, Color,
    ColorProperties, DocumentHandle, DocumentInfo, IDENTITY_POSITION, PositionComponents,
    ProductHandle, ProductInfo, RawParameter,
};

/// A document in the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub name: String,
    pub path: PathBuf,
    /// Root product id
    pub root: u64,
    /// Simulates a document whose resolution fails transiently
    #[serde(default)]
    pub unavailable: bool,
}

/// A product instance in the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryProduct {
    pub name: String,
    pub part_number: String,
    #[serde(default)]
    pub description: String,
    /// Backing document id
    pub document: u64,
    #[serde(default)]
    pub children: Vec<u64>,
    #[serde(default)]
    pub parameters: Vec<MemoryParameter>,
    #[serde(default = "identity_position")]
    pub position: PositionComponents,
    #[serde(default)]
    pub body: Option<MemoryBody>,
    #[serde(default)]
    pub material: Option<String>,
}

/// A named parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryParameter {
    pub name: String,
    pub value: AutomationValue,
}

/// Main body of a part with its graphic properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBody {
    pub id: u64,
    #[serde(default)]
    pub real: Option<Color>,
    #[serde(default)]
    pub visible: Option<Color>,
}

fn identity_position() -> PositionComponents {
    IDENTITY_POSITION
}

/// Session snapshot errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// In-memory CAD session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySession {
    /// Simulates an application that is not running
    #[serde(default)]
    pub offline: bool,
    pub active_document: Option<u64>,
    #[serde(default)]
    pub documents: BTreeMap<u64, MemoryDocument>,
    #[serde(default)]
    pub products: BTreeMap<u64, MemoryProduct>,
    /// Material libraries keyed by library path
    #[serde(default)]
    pub material_libraries: BTreeMap<PathBuf, Vec<String>>,
    /// Number of state-changing calls served
    #[serde(skip)]
    mutations: u64,
}

impl MemorySession {
    /// Create an empty running session
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a session snapshot from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SessionError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| SessionError::Deserialize(e.to_string()))
    }

    /// Save the session snapshot to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SessionError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| SessionError::Io(e.to_string()))
    }

    /// Number of state-changing calls served so far
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    fn next_id(&self) -> u64 {
        let documents = self.documents.keys().copied();
        let products = self.products.keys().copied();
        let bodies = self
            .products
            .values()
            .filter_map(|p| p.body.as_ref().map(|b| b.id));
        documents.chain(products).chain(bodies).max().map_or(1, |id| id + 1)
    }

    /// Add a document with a root product named after the file stem
    pub fn add_document(&mut self, name: &str, path: impl Into<PathBuf>) -> DocumentHandle {
        let document_id = self.next_id();
        let root_id = document_id + 1;
        let stem = file_stem(name);
        self.documents.insert(
            document_id,
            MemoryDocument {
                name: name.to_string(),
                path: path.into(),
                root: root_id,
                unavailable: false,
            },
        );
        let body = is_part_file(name).then_some(MemoryBody {
            id: root_id + 1,
            real: None,
            visible: None,
        });
        self.products.insert(root_id, product_record(&stem, document_id, body));
        if self.active_document.is_none() {
            self.active_document = Some(document_id);
        }
        DocumentHandle(document_id)
    }

    /// Add a child product instance backed by `document`
    ///
    /// The part number is taken from the document's file stem.
    pub fn add_product(
        &mut self,
        parent: ProductHandle,
        name: &str,
        document: DocumentHandle,
    ) -> ProductHandle {
        let id = self.next_id();
        let document_name = self
            .documents
            .get(&document.0)
            .map(|d| d.name.clone())
            .unwrap_or_default();
        let body = is_part_file(&document_name).then_some(MemoryBody {
            id: id + 1,
            real: None,
            visible: None,
        });
        let mut record = product_record(name, document.0, body);
        record.part_number = file_stem(&document_name);
        self.products.insert(id, record);
        if let Some(parent) = self.products.get_mut(&parent.0) {
            parent.children.push(id);
        }
        ProductHandle(id)
    }

    /// Root product of a document, bypassing availability checks
    pub fn root_of(&self, document: DocumentHandle) -> Option<ProductHandle> {
        self.documents.get(&document.0).map(|d| ProductHandle(d.root))
    }

    /// Mark a document as transiently unavailable
    pub fn set_document_unavailable(&mut self, document: DocumentHandle, unavailable: bool) {
        if let Some(doc) = self.documents.get_mut(&document.0) {
            doc.unavailable = unavailable;
        }
    }

    /// Register a material library
    pub fn add_material_library(&mut self, library: impl Into<PathBuf>, materials: Vec<String>) {
        self.material_libraries.insert(library.into(), materials);
    }

    /// Find a product by instance name
    pub fn find_product(&self, name: &str) -> Option<ProductHandle> {
        self.products
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(id, _)| ProductHandle(*id))
    }

    /// Direct read access to a product record
    pub fn product_record(&self, product: ProductHandle) -> Option<&MemoryProduct> {
        self.products.get(&product.0)
    }

    fn ensure_running(&self) -> AutomationResult<()> {
        if self.offline {
            Err(AutomationError::NotRunning)
        } else {
            Ok(())
        }
    }

    fn get_document(&self, document: DocumentHandle) -> AutomationResult<&MemoryDocument> {
        self.ensure_running()?;
        self.documents
            .get(&document.0)
            .ok_or(AutomationError::UnknownDocument(document))
    }

    fn get_product(&self, product: ProductHandle) -> AutomationResult<&MemoryProduct> {
        self.ensure_running()?;
        self.products
            .get(&product.0)
            .ok_or(AutomationError::UnknownProduct(product))
    }

    fn get_product_mut(&mut self, product: ProductHandle) -> AutomationResult<&mut MemoryProduct> {
        self.ensure_running()?;
        self.mutations += 1;
        self.products
            .get_mut(&product.0)
            .ok_or(AutomationError::UnknownProduct(product))
    }

    fn find_body(&self, document: DocumentHandle, body: BodyHandle) -> Option<u64> {
        self.products
            .iter()
            .find(|(_, p)| p.document == document.0 && p.body.as_ref().is_some_and(|b| b.id == body.0))
            .map(|(id, _)| *id)
    }
}

fn product_record(name: &str, document: u64, body: Option<MemoryBody>) -> MemoryProduct {
    MemoryProduct {
        name: name.to_string(),
        part_number: name.to_string(),
        description: String::new(),
        document,
        children: Vec::new(),
        parameters: Vec::new(),
        position: IDENTITY_POSITION,
        body,
        material: None,
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

fn is_part_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("CATPart"))
}

impl CadAutomation for MemorySession {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_running(&self) -> bool {
        !self.offline
    }

    fn active_document(&self) -> AutomationResult<DocumentHandle> {
        self.ensure_running()?;
        self.active_document
            .map(DocumentHandle)
            .ok_or_else(|| AutomationError::Unavailable("no active document".into()))
    }

    fn document(&self, document: DocumentHandle) -> AutomationResult<DocumentInfo> {
        let doc = self.get_document(document)?;
        if doc.unavailable {
            return Err(AutomationError::Unavailable(doc.name.clone()));
        }
        Ok(DocumentInfo {
            name: doc.name.clone(),
            path: doc.path.clone(),
        })
    }

    fn root_product(&self, document: DocumentHandle) -> AutomationResult<ProductHandle> {
        self.get_document(document).map(|d| ProductHandle(d.root))
    }

    fn product(&self, product: ProductHandle) -> AutomationResult<ProductInfo> {
        let p = self.get_product(product)?;
        Ok(ProductInfo {
            name: p.name.clone(),
            part_number: p.part_number.clone(),
            description: p.description.clone(),
        })
    }

    fn children(&self, product: ProductHandle) -> AutomationResult<Vec<ProductHandle>> {
        let p = self.get_product(product)?;
        Ok(p.children.iter().copied().map(ProductHandle).collect())
    }

    fn reference_document(&self, product: ProductHandle) -> AutomationResult<DocumentHandle> {
        let p = self.get_product(product)?;
        let document = DocumentHandle(p.document);
        if self.get_document(document)?.unavailable {
            return Err(AutomationError::Unavailable(format!(
                "reference document of {}",
                p.name
            )));
        }
        Ok(document)
    }

    fn parameters(&self, product: ProductHandle) -> AutomationResult<Vec<RawParameter>> {
        let p = self.get_product(product)?;
        Ok(p.parameters
            .iter()
            .map(|param| RawParameter {
                name: param.name.clone(),
                value: param.value.value_as_string(),
            })
            .collect())
    }

    fn set_parameter(
        &mut self,
        product: ProductHandle,
        name: &str,
        value: &AutomationValue,
    ) -> AutomationResult<()> {
        let p = self.get_product_mut(product)?;
        match p.parameters.iter_mut().find(|param| param.name == name) {
            Some(existing) => existing.value = value.clone(),
            None => p.parameters.push(MemoryParameter {
                name: name.to_string(),
                value: value.clone(),
            }),
        }
        Ok(())
    }

    fn position(&self, product: ProductHandle) -> AutomationResult<PositionComponents> {
        self.get_product(product).map(|p| p.position)
    }

    fn set_position(
        &mut self,
        product: ProductHandle,
        components: PositionComponents,
    ) -> AutomationResult<()> {
        self.get_product_mut(product)?.position = components;
        Ok(())
    }

    fn add_component_from_file(
        &mut self,
        parent: ProductHandle,
        file: &Path,
    ) -> AutomationResult<ProductHandle> {
        self.get_product(parent)?;
        if !file.is_file() {
            return Err(AutomationError::Rejected(format!(
                "file not found: {}",
                file.display()
            )));
        }
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AutomationError::Rejected(format!("invalid file name: {}", file.display())))?
            .to_string();
        let directory = file.parent().map(Path::to_path_buf).unwrap_or_default();

        let existing = self
            .documents
            .iter()
            .find(|(_, d)| d.name == name && d.path == directory)
            .map(|(id, _)| DocumentHandle(*id));
        let document = match existing {
            Some(document) => document,
            None => self.add_document(&name, directory),
        };

        self.mutations += 1;
        Ok(self.add_product(parent, &file_stem(&name), document))
    }

    fn main_body(&self, product: ProductHandle) -> AutomationResult<Option<BodyHandle>> {
        let p = self.get_product(product)?;
        Ok(p.body.as_ref().map(|b| BodyHandle(b.id)))
    }

    fn body_colors(
        &self,
        document: DocumentHandle,
        body: BodyHandle,
    ) -> AutomationResult<ColorProperties> {
        self.ensure_running()?;
        let owner = self
            .find_body(document, body)
            .ok_or_else(|| AutomationError::Unavailable(format!("body {:?}", body)))?;
        let body = self.products[&owner].body.as_ref();
        Ok(ColorProperties {
            real: body.and_then(|b| b.real),
            visible: body.and_then(|b| b.visible),
        })
    }

    fn set_body_color(
        &mut self,
        document: DocumentHandle,
        body: BodyHandle,
        color: Color,
    ) -> AutomationResult<()> {
        self.ensure_running()?;
        let owner = self
            .find_body(document, body)
            .ok_or_else(|| AutomationError::Unavailable(format!("body {:?}", body)))?;
        let record = self.get_product_mut(ProductHandle(owner))?;
        if let Some(body) = record.body.as_mut() {
            body.real = Some(color);
            body.visible = Some(color);
        }
        Ok(())
    }

    fn material(&self, product: ProductHandle) -> AutomationResult<Option<String>> {
        self.get_product(product).map(|p| p.material.clone())
    }

    fn apply_material(&mut self, product: ProductHandle, material: &str) -> AutomationResult<()> {
        let known = self
            .material_libraries
            .values()
            .any(|names| names.iter().any(|n| n == material));
        if !known {
            return Err(AutomationError::Rejected(format!(
                "material not in any library: {}",
                material
            )));
        }
        self.get_product_mut(product)?.material = Some(material.to_string());
        Ok(())
    }

    fn material_library(&self, library: &Path) -> AutomationResult<Vec<String>> {
        self.ensure_running()?;
        self.material_libraries
            .get(library)
            .cloned()
            .ok_or_else(|| AutomationError::Rejected(format!("no library at {}", library.display())))
    }
}
