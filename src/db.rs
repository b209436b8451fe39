use anyhow::Result;
use sqlx::PgPool;

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entity_types (
            entity_type VARCHAR(4) PRIMARY KEY,
            description VARCHAR(250) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS countries (
            country VARCHAR(4) PRIMARY KEY,
            country_name VARCHAR(250) NOT NULL,
            iso_code VARCHAR(4) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS province_states (
            province_state VARCHAR(4) PRIMARY KEY,
            name VARCHAR(250) NOT NULL,
            iso_code VARCHAR(4) NOT NULL,
            country VARCHAR(4) NOT NULL REFERENCES countries(country) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            entity VARCHAR(4) PRIMARY KEY,
            entity_name VARCHAR(250) NOT NULL,
            entity_type VARCHAR(4) NOT NULL REFERENCES entity_types(entity_type) ON DELETE CASCADE,
            country VARCHAR(4) NOT NULL REFERENCES countries(country) ON DELETE CASCADE,
            province_state VARCHAR(4) NOT NULL REFERENCES province_states(province_state) ON DELETE CASCADE,
            link TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id BIGSERIAL PRIMARY KEY,
            entity VARCHAR(4) NOT NULL REFERENCES entities(entity) ON DELETE CASCADE,
            link TEXT NOT NULL DEFAULT '',
            case_number VARCHAR(100) NOT NULL,
            filename_description VARCHAR(250) NOT NULL,
            file_url TEXT NOT NULL,
            document_type VARCHAR(100) NOT NULL,
            issued_date DATE NOT NULL,
            received_date DATE NOT NULL,
            submitter VARCHAR(4) NOT NULL REFERENCES entities(entity) ON DELETE CASCADE,
            applicant VARCHAR(4) NOT NULL REFERENCES entities(entity) ON DELETE CASCADE,
            status VARCHAR(100) NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_entity_issued ON documents(entity, issued_date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_case_number ON documents(case_number)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_file_url ON documents(file_url)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_meta (
            document_id BIGINT PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
            new_doc_indicator BOOLEAN NOT NULL DEFAULT TRUE,
            content_type VARCHAR(100) NOT NULL DEFAULT '',
            content_size INTEGER NOT NULL DEFAULT 0,
            num_pages INTEGER NOT NULL DEFAULT 0,
            loaded_to_analytics BOOLEAN NOT NULL DEFAULT FALSE,
            scrape_date DATE,
            insert_date DATE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS page_texts (
            id BIGSERIAL PRIMARY KEY,
            url TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            page_text TEXT NOT NULL,
            search_vector TSVECTOR
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The URL join against documents.file_url is lookup-only (no FK); keep
    // it indexed so detail views and search stay O(matching rows).
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_page_texts_url ON page_texts(url)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_page_texts_search_vector ON page_texts USING GIN (search_vector)",
    )
    .execute(pool)
    .await?;

    install_search_vector_trigger(pool).await?;

    // Per-user workflow tables. Schema only, apart from the favorites toggle.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_favorite_documents (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            UNIQUE (user_id, document_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_document_notes (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            private_note BOOLEAN NOT NULL DEFAULT FALSE,
            page_number INTEGER NOT NULL,
            text_reference TEXT NOT NULL DEFAULT '',
            note_text TEXT NOT NULL,
            note_date DATE NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inbox_message_types (
            message_type VARCHAR(4) PRIMARY KEY,
            description VARCHAR(250) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_inbox (
            id BIGSERIAL PRIMARY KEY,
            sending_user BIGINT NOT NULL,
            receiving_user BIGINT NOT NULL,
            message_type VARCHAR(4) NOT NULL REFERENCES inbox_message_types(message_type) ON DELETE CASCADE,
            message_date DATE NOT NULL,
            message_text TEXT NOT NULL,
            mark_as_read BOOLEAN NOT NULL DEFAULT FALSE,
            document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migration completed");

    initialize_default_data(pool).await?;

    Ok(())
}

/// Install the trigger that keeps `page_texts.search_vector` consistent
/// with {url, page_number, page_text} on every insert/update. Database-side
/// so the index cannot drift from the source text even under direct writes.
async fn install_search_vector_trigger(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION page_texts_search_vector_update() RETURNS trigger AS $$
        BEGIN
            NEW.search_vector := to_tsvector(
                'pg_catalog.english',
                coalesce(NEW.url, '') || ' ' || NEW.page_number::text || ' ' || coalesce(NEW.page_text, '')
            );
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE OR REPLACE TRIGGER page_texts_search_vector_trigger
        BEFORE INSERT OR UPDATE OF url, page_number, page_text
        ON page_texts
        FOR EACH ROW
        EXECUTE FUNCTION page_texts_search_vector_update()
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default data
async fn initialize_default_data(pool: &PgPool) -> Result<()> {
    let type_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entity_types")
        .fetch_one(pool)
        .await?;

    if type_count == 0 {
        tracing::info!("First startup, initializing default data...");

        let entity_types = vec![
            ("REG", "Regulator"),
            ("UTIL", "Utility"),
            ("COMP", "Company"),
            ("UNKN", "Unknown entity type"),
        ];
        for (code, description) in entity_types {
            sqlx::query(
                "INSERT INTO entity_types (entity_type, description) VALUES ($1, $2)
                 ON CONFLICT (entity_type) DO NOTHING",
            )
            .bind(code)
            .bind(description)
            .execute(pool)
            .await?;
        }

        sqlx::query(
            "INSERT INTO countries (country, country_name, iso_code) VALUES ($1, $2, $3)
             ON CONFLICT (country) DO NOTHING",
        )
        .bind("CA")
        .bind("Canada")
        .bind("CA")
        .execute(pool)
        .await?;

        sqlx::query(
            "INSERT INTO province_states (province_state, name, iso_code, country)
             VALUES ($1, $2, $3, $4) ON CONFLICT (province_state) DO NOTHING",
        )
        .bind("ON")
        .bind("Ontario")
        .bind("ON")
        .bind("CA")
        .execute(pool)
        .await?;

        // Extracts carry no submitter/applicant column; ingest resolves
        // those references against this sentinel entity.
        sqlx::query(
            "INSERT INTO entities (entity, entity_name, entity_type, country, province_state, link)
             VALUES ($1, $2, $3, $4, $5, '') ON CONFLICT (entity) DO NOTHING",
        )
        .bind("UNKN")
        .bind("Unknown")
        .bind("UNKN")
        .bind("CA")
        .bind("ON")
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "INSERT INTO inbox_message_types (message_type, description)
         VALUES ('NOTE', 'Note shared from a document')
         ON CONFLICT (message_type) DO NOTHING",
    )
    .execute(pool)
    .await?;

    Ok(())
}
