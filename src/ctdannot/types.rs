use flexstr::SharedStr as FlexStr;

pub type VocabularyName = FlexStr;
pub type TermAcc = FlexStr;
pub type TermName = FlexStr;
pub type SynonymType = FlexStr;

pub type ChemicalId = FlexStr;
pub type ChemicalName = FlexStr;
pub type CasNumber = FlexStr;

pub type GeneId = i32;
pub type GeneSymbol = FlexStr;
pub type GeneName = FlexStr;
pub type ExternalGeneId = FlexStr;
pub type XdbKey = i32;

pub type AnnotationKey = i32;
pub type ReferenceId = i32;
pub type OwnerId = i32;
pub type Aspect = FlexStr;
pub type DataSource = FlexStr;
pub type Qualifier = FlexStr;
pub type WithInfo = FlexStr;
pub type EvidenceCode = FlexStr;

pub type OrganismTaxonId = u32;
pub type OrganismName = FlexStr;
