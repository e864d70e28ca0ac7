//! CSV loading for Open Images style relationship annotations and predictions.
//!
//! Relationship rows carry `ImageID, LabelName1, LabelName2, XMin1, XMax1,
//! YMin1, YMax1, XMin2, XMax2, YMin2, YMax2, RelationshipLabel`; prediction
//! rows add `Score`. Image-level label rows carry `ImageID, LabelName`.
//! Class and predicate names are resolved to ids through [`LabelMap`]s.

use crate::error::{Result, VrdEvalError};
use crate::groundtruth::GroundTruthIndex;
use crate::label_map::LabelMap;
use crate::types::{BoundingBox, ClassKey, RelationshipInstance, ScoredRelationshipInstance};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const IMAGE_ID: &str = "ImageID";
pub const SUBJECT_LABEL: &str = "LabelName1";
pub const OBJECT_LABEL: &str = "LabelName2";
pub const RELATIONSHIP_LABEL: &str = "RelationshipLabel";
pub const IMAGE_LABEL: &str = "LabelName";
pub const SCORE: &str = "Score";

/// Subject box columns in (y_min, x_min, y_max, x_max) order.
const SUBJECT_BOX: [&str; 4] = ["YMin1", "XMin1", "YMax1", "XMax1"];
/// Object box columns in (y_min, x_min, y_max, x_max) order.
const OBJECT_BOX: [&str; 4] = ["YMin2", "XMin2", "YMax2", "XMax2"];

const RELATIONSHIP_COLUMNS: [&str; 12] = [
    IMAGE_ID,
    SUBJECT_LABEL,
    OBJECT_LABEL,
    RELATIONSHIP_LABEL,
    "YMin1",
    "XMin1",
    "YMax1",
    "XMax1",
    "YMin2",
    "XMin2",
    "YMax2",
    "XMax2",
];

/// All groundtruth of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundtruthImage {
    pub image_id: String,
    pub relationships: Vec<RelationshipInstance>,
    /// Object classes verified by image-level labels.
    pub verified_labels: Vec<u64>,
}

impl GroundtruthImage {
    /// Build the groundtruth index of this image.
    pub fn into_index(self) -> Result<GroundTruthIndex> {
        let mut index = GroundTruthIndex::from_instances(self.image_id, self.relationships)?;
        index.add_verified_labels(self.verified_labels);
        Ok(index)
    }
}

/// All predictions of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionImage {
    pub image_id: String,
    pub detections: Vec<ScoredRelationshipInstance>,
}

/// Header positions of the required columns of one CSV source.
struct Columns {
    source: String,
    positions: HashMap<&'static str, usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, required: &[&'static str], source: &str) -> Result<Self> {
        let mut positions = HashMap::new();
        for &column in required {
            let position = headers.iter().position(|h| h == column).ok_or_else(|| {
                VrdEvalError::MalformedInput(format!(
                    "{}: missing required column '{}'",
                    source, column
                ))
            })?;
            positions.insert(column, position);
        }
        Ok(Self {
            source: source.to_string(),
            positions,
        })
    }

    fn text<'r>(&self, record: &'r StringRecord, column: &'static str) -> Result<&'r str> {
        let value = self
            .positions
            .get(column)
            .and_then(|&position| record.get(position))
            .unwrap_or("");
        if value.is_empty() {
            return Err(VrdEvalError::MalformedInput(format!(
                "{} line {}: empty field '{}'",
                self.source,
                line_of(record),
                column
            )));
        }
        Ok(value)
    }

    fn number(&self, record: &StringRecord, column: &'static str) -> Result<f64> {
        let value = self.text(record, column)?;
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                VrdEvalError::MalformedInput(format!(
                    "{} line {}: field '{}' is not a finite number: '{}'",
                    self.source,
                    line_of(record),
                    column,
                    value
                ))
            })
    }

    fn bbox(&self, record: &StringRecord, columns: &[&'static str; 4]) -> Result<BoundingBox> {
        let [y_min, x_min, y_max, x_max] = [
            self.number(record, columns[0])?,
            self.number(record, columns[1])?,
            self.number(record, columns[2])?,
            self.number(record, columns[3])?,
        ];
        BoundingBox::try_new(y_min, x_min, y_max, x_max).map_err(|err| match err {
            VrdEvalError::InvalidBoundingBox(msg) => VrdEvalError::InvalidBoundingBox(format!(
                "{} line {}: {}",
                self.source,
                line_of(record),
                msg
            )),
            other => other,
        })
    }

    fn relationship(
        &self,
        record: &StringRecord,
        classes: &LabelMap,
        relationships: &LabelMap,
    ) -> Result<RelationshipInstance> {
        let class_key = ClassKey::new(
            classes.id(self.text(record, SUBJECT_LABEL)?)?,
            relationships.id(self.text(record, RELATIONSHIP_LABEL)?)?,
            classes.id(self.text(record, OBJECT_LABEL)?)?,
        );
        Ok(RelationshipInstance::new(
            self.text(record, IMAGE_ID)?,
            class_key,
            self.bbox(record, &SUBJECT_BOX)?,
            self.bbox(record, &OBJECT_BOX)?,
        ))
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader)
}

/// Read groundtruth relationship rows.
pub fn read_groundtruth_boxes<R: Read>(
    reader: R,
    classes: &LabelMap,
    relationships: &LabelMap,
) -> Result<Vec<RelationshipInstance>> {
    let mut reader = csv_reader(reader);
    let columns = Columns::resolve(reader.headers()?, &RELATIONSHIP_COLUMNS, "groundtruth boxes")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(columns.relationship(&record?, classes, relationships)?);
    }
    Ok(rows)
}

/// Read image-level label rows as `(image id, class id)` pairs.
pub fn read_image_labels<R: Read>(reader: R, classes: &LabelMap) -> Result<Vec<(String, u64)>> {
    let mut reader = csv_reader(reader);
    let columns = Columns::resolve(reader.headers()?, &[IMAGE_ID, IMAGE_LABEL], "groundtruth labels")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let image_id = columns.text(&record, IMAGE_ID)?.to_string();
        let class_id = classes.id(columns.text(&record, IMAGE_LABEL)?)?;
        rows.push((image_id, class_id));
    }
    Ok(rows)
}

/// Read scored prediction rows.
pub fn read_predictions<R: Read>(
    reader: R,
    classes: &LabelMap,
    relationships: &LabelMap,
) -> Result<Vec<ScoredRelationshipInstance>> {
    let mut reader = csv_reader(reader);
    let mut required = RELATIONSHIP_COLUMNS.to_vec();
    required.push(SCORE);
    let columns = Columns::resolve(reader.headers()?, &required, "predictions")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let relationship = columns.relationship(&record, classes, relationships)?;
        let score = columns.number(&record, SCORE)?;
        rows.push(ScoredRelationshipInstance::new(relationship, score));
    }
    Ok(rows)
}

/// Group groundtruth by image, in order of first appearance.
///
/// Images that only appear in the label rows get an entry with no
/// relationships.
pub fn group_groundtruth(
    relationships: Vec<RelationshipInstance>,
    labels: Vec<(String, u64)>,
) -> Vec<GroundtruthImage> {
    let mut images: Vec<GroundtruthImage> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let mut slot = |image_id: &str, images: &mut Vec<GroundtruthImage>| -> usize {
        *positions.entry(image_id.to_string()).or_insert_with(|| {
            images.push(GroundtruthImage {
                image_id: image_id.to_string(),
                relationships: Vec::new(),
                verified_labels: Vec::new(),
            });
            images.len() - 1
        })
    };

    for relationship in relationships {
        let position = slot(&relationship.image_id, &mut images);
        images[position].relationships.push(relationship);
    }
    for (image_id, class_id) in labels {
        let position = slot(&image_id, &mut images);
        images[position].verified_labels.push(class_id);
    }
    images
}

/// Group predictions by image, in order of first appearance.
pub fn group_predictions(detections: Vec<ScoredRelationshipInstance>) -> Vec<PredictionImage> {
    let mut images: Vec<PredictionImage> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for detection in detections {
        let image_id = detection.relationship.image_id.clone();
        let position = *positions.entry(image_id.clone()).or_insert_with(|| {
            images.push(PredictionImage {
                image_id,
                detections: Vec::new(),
            });
            images.len() - 1
        });
        images[position].detections.push(detection);
    }
    images
}

/// Load groundtruth relationship and image-level label files.
///
/// # Errors
///
/// Returns an error if either file cannot be read, a required column is
/// missing, a field is malformed, or a name is absent from its label map.
///
/// # Example
///
/// ```no_run
/// use vrd_eval::label_map::LabelMap;
/// use vrd_eval::loader::load_groundtruth;
///
/// let classes = LabelMap::from_file("class_labelmap.pbtxt").unwrap();
/// let predicates = LabelMap::from_file("relationship_labelmap.pbtxt").unwrap();
/// let images = load_groundtruth("vrd-boxes.csv", "vrd-labels.csv", &classes, &predicates).unwrap();
/// println!("Loaded groundtruth for {} images", images.len());
/// ```
pub fn load_groundtruth<P: AsRef<Path>, Q: AsRef<Path>>(
    boxes_path: P,
    labels_path: Q,
    classes: &LabelMap,
    relationships: &LabelMap,
) -> Result<Vec<GroundtruthImage>> {
    let rows = read_groundtruth_boxes(File::open(boxes_path)?, classes, relationships)?;
    let labels = read_image_labels(File::open(labels_path)?, classes)?;
    Ok(group_groundtruth(rows, labels))
}

/// Load a predictions file, grouped by image.
pub fn load_predictions<P: AsRef<Path>>(
    path: P,
    classes: &LabelMap,
    relationships: &LabelMap,
) -> Result<Vec<PredictionImage>> {
    let rows = read_predictions(File::open(path)?, classes, relationships)?;
    Ok(group_predictions(rows))
}
