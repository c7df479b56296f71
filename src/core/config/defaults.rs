pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_KEYWORD_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ANSWER_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MIN_WAIT_SECS: f64 = 1.0;
pub const DEFAULT_MAX_WAIT_SECS: f64 = 60.0;
pub const DEFAULT_BACKOFF_MULTIPLIER_SECS: f64 = 1.0;

pub const DEFAULT_COLLECTION: &str = "course_chunks";
pub const DEFAULT_NUM_RESULTS: usize = 3;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

pub const DEFAULT_COURSES_DB: &str = "courses.db";
pub const DEFAULT_VECTOR_DB: &str = "vector_index.db";
pub const DEFAULT_SESSIONS_DB: &str = "sessions.db";

pub const DEFAULT_GEN_ED_RESOURCE: &str =
    "the registrar's general education requirements page";
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
