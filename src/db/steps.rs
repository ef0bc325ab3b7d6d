use std::fmt;

use serde::Serialize;

/// Label used to group progress output; steps of the same group are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepGroup {
    PfColumns,
    AlumnesColumns,
    Appointments,
    AppointmentIndexes,
    ChangeRequests,
    ChangeRequestIndexes,
}

impl fmt::Display for StepGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepGroup::PfColumns => "pf columns",
            StepGroup::AlumnesColumns => "alumnes columns",
            StepGroup::Appointments => "cites_calendari",
            StepGroup::AppointmentIndexes => "cites_calendari indexes",
            StepGroup::ChangeRequests => "solicituts_canvi_dades",
            StepGroup::ChangeRequestIndexes => "solicituts_canvi_dades indexes",
        })
    }
}

/// The schema object a step guarantees to exist once it has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaObject {
    Column {
        table: &'static str,
        column: &'static str,
    },
    Table {
        name: &'static str,
    },
    Index {
        table: &'static str,
        name: &'static str,
    },
}

impl fmt::Display for SchemaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaObject::Column { table, column } => write!(f, "{table}.{column}"),
            SchemaObject::Table { name } | SchemaObject::Index { name, .. } => f.write_str(name),
        }
    }
}

/// One idempotent DDL statement. Each statement is guarded by `IF NOT EXISTS`
/// so it can be replayed against a schema that already has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStep {
    pub group: StepGroup,
    pub description: &'static str,
    pub target: SchemaObject,
    pub statement: &'static str,
}

const fn pf_column(
    description: &'static str,
    column: &'static str,
    statement: &'static str,
) -> MigrationStep {
    MigrationStep {
        group: StepGroup::PfColumns,
        description,
        target: SchemaObject::Column { table: "pf", column },
        statement,
    }
}

const fn appointment_index(
    description: &'static str,
    name: &'static str,
    statement: &'static str,
) -> MigrationStep {
    MigrationStep {
        group: StepGroup::AppointmentIndexes,
        description,
        target: SchemaObject::Index { table: "cites_calendari", name },
        statement,
    }
}

const fn change_request_index(
    description: &'static str,
    name: &'static str,
    statement: &'static str,
) -> MigrationStep {
    MigrationStep {
        group: StepGroup::ChangeRequestIndexes,
        description,
        target: SchemaObject::Index { table: "solicituts_canvi_dades", name },
        statement,
    }
}

const CREATE_CITES_CALENDARI: &str = r#"CREATE TABLE IF NOT EXISTS cites_calendari (
    id TEXT PRIMARY KEY,
    alumne_id TEXT NOT NULL REFERENCES alumnes(alumne_id) ON DELETE CASCADE,
    tutor_email TEXT NOT NULL REFERENCES usuaris(email) ON DELETE CASCADE,
    any_curs TEXT NOT NULL REFERENCES cursos(any_curs) ON DELETE CASCADE,
    data_cita TIMESTAMP WITH TIME ZONE NOT NULL,
    durada_minuts INTEGER DEFAULT 30,
    nom_familia TEXT NOT NULL,
    email_familia TEXT NOT NULL,
    telefon_familia TEXT NOT NULL,
    estat TEXT NOT NULL CHECK (estat IN ('pendent','confirmada','realitzada','cancelada')) DEFAULT 'pendent',
    notes TEXT,
    google_event_id TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);"#;

const CREATE_SOLICITUTS_CANVI_DADES: &str = r#"CREATE TABLE IF NOT EXISTS solicituts_canvi_dades (
    id TEXT PRIMARY KEY,
    alumne_id TEXT NOT NULL REFERENCES alumnes(alumne_id) ON DELETE CASCADE,
    tutor_solicitant TEXT NOT NULL REFERENCES usuaris(email) ON DELETE CASCADE,
    camp_modificar TEXT NOT NULL,
    valor_actual TEXT,
    valor_nou TEXT,
    justificacio TEXT NOT NULL,
    estat TEXT NOT NULL CHECK (estat IN ('pendent','aprovada','rebutjada')) DEFAULT 'pendent',
    admin_responsable TEXT REFERENCES usuaris(email),
    data_resolucio TIMESTAMP WITH TIME ZONE,
    notes_admin TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);"#;

/// The full catalogue, in execution order. Indexes come after the table they
/// index, and both tables need `alumnes`, `usuaris` and `cursos` to exist.
pub const ALL: &[MigrationStep] = &[
    // --- pf: personal data fields ---
    pf_column(
        "Add pf.municipi_naixement",
        "municipi_naixement",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS municipi_naixement TEXT;",
    ),
    pf_column(
        "Add pf.nacionalitat",
        "nacionalitat",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS nacionalitat TEXT;",
    ),
    pf_column(
        "Add pf.adreca",
        "adreca",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS adreca TEXT;",
    ),
    pf_column(
        "Add pf.municipi_residencia",
        "municipi_residencia",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS municipi_residencia TEXT;",
    ),
    pf_column(
        "Add pf.codi_postal",
        "codi_postal",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS codi_postal TEXT;",
    ),
    pf_column(
        "Add pf.doc_identitat",
        "doc_identitat",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS doc_identitat TEXT;",
    ),
    pf_column(
        "Add pf.tis",
        "tis",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS tis TEXT;",
    ),
    pf_column(
        "Add pf.ralc",
        "ralc",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS ralc TEXT;",
    ),
    pf_column(
        "Add pf.link_fotografia",
        "link_fotografia",
        "ALTER TABLE pf ADD COLUMN IF NOT EXISTS link_fotografia TEXT;",
    ),
    // --- alumnes ---
    MigrationStep {
        group: StepGroup::AlumnesColumns,
        description: "Add alumnes.email",
        target: SchemaObject::Column { table: "alumnes", column: "email" },
        statement: "ALTER TABLE alumnes ADD COLUMN IF NOT EXISTS email TEXT;",
    },
    // --- Appointments ---
    MigrationStep {
        group: StepGroup::Appointments,
        description: "Create table cites_calendari",
        target: SchemaObject::Table { name: "cites_calendari" },
        statement: CREATE_CITES_CALENDARI,
    },
    appointment_index(
        "Index cites_calendari by student",
        "idx_cites_calendari_alumne",
        "CREATE INDEX IF NOT EXISTS idx_cites_calendari_alumne ON cites_calendari(alumne_id);",
    ),
    appointment_index(
        "Index cites_calendari by tutor",
        "idx_cites_calendari_tutor",
        "CREATE INDEX IF NOT EXISTS idx_cites_calendari_tutor ON cites_calendari(tutor_email);",
    ),
    appointment_index(
        "Index cites_calendari by date",
        "idx_cites_calendari_data",
        "CREATE INDEX IF NOT EXISTS idx_cites_calendari_data ON cites_calendari(data_cita);",
    ),
    appointment_index(
        "Index cites_calendari by status",
        "idx_cites_calendari_estat",
        "CREATE INDEX IF NOT EXISTS idx_cites_calendari_estat ON cites_calendari(estat);",
    ),
    // --- Data change requests ---
    MigrationStep {
        group: StepGroup::ChangeRequests,
        description: "Create table solicituts_canvi_dades",
        target: SchemaObject::Table { name: "solicituts_canvi_dades" },
        statement: CREATE_SOLICITUTS_CANVI_DADES,
    },
    change_request_index(
        "Index solicituts_canvi_dades by student",
        "idx_solicituts_canvi_alumne",
        "CREATE INDEX IF NOT EXISTS idx_solicituts_canvi_alumne ON solicituts_canvi_dades(alumne_id);",
    ),
    change_request_index(
        "Index solicituts_canvi_dades by tutor",
        "idx_solicituts_canvi_tutor",
        "CREATE INDEX IF NOT EXISTS idx_solicituts_canvi_tutor ON solicituts_canvi_dades(tutor_solicitant);",
    ),
    change_request_index(
        "Index solicituts_canvi_dades by status",
        "idx_solicituts_canvi_estat",
        "CREATE INDEX IF NOT EXISTS idx_solicituts_canvi_estat ON solicituts_canvi_dades(estat);",
    ),
];
