use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::GradeRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let learners = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@example.edu",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@example.edu",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@example.edu",
        ),
    ];

    for (id, name, email) in learners {
        sqlx::query(
            r#"
            INSERT INTO learner_performance.learners (id, full_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(pool)
        .await?;
    }

    let grades = vec![
        (
            "seed-001",
            "avery.lee@example.edu",
            "Data Analysis",
            "SQL Fundamentals",
            "query-lab-1",
            88.0,
            100.0,
            1.0,
            "Strong joins, weak window functions",
            NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?,
        ),
        (
            "seed-002",
            "avery.lee@example.edu",
            "Data Analysis",
            "SQL Fundamentals",
            "query-lab-2",
            92.0,
            100.0,
            1.5,
            "Clean solution",
            NaiveDate::from_ymd_opt(2026, 1, 26).context("invalid date")?,
        ),
        (
            "seed-003",
            "avery.lee@example.edu",
            "Data Analysis",
            "Visualization",
            "dashboard-project",
            64.0,
            100.0,
            2.0,
            "Chart choices need work",
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
        ),
        (
            "seed-004",
            "jules.moreno@example.edu",
            "Data Analysis",
            "SQL Fundamentals",
            "query-lab-1",
            45.0,
            100.0,
            1.0,
            "Missed the deadline extension",
            NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?,
        ),
        (
            "seed-005",
            "kiara.patel@example.edu",
            "Web Development",
            "HTTP Basics",
            "routing-quiz",
            78.0,
            100.0,
            1.0,
            "",
            NaiveDate::from_ymd_opt(2026, 1, 20).context("invalid date")?,
        ),
    ];

    for (source_key, email, program, competency, activity, score, max_score, weight, observation, evaluated_at) in
        grades
    {
        let learner_id: Uuid = sqlx::query(
            "SELECT id FROM learner_performance.learners WHERE email = $1",
        )
        .bind(email)
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO learner_performance.grade_records
            (id, learner_id, program, competency, activity, score, max_score, weight, observation, evaluated_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(learner_id)
        .bind(program)
        .bind(competency)
        .bind(activity)
        .bind(score)
        .bind(max_score)
        .bind(weight)
        .bind(observation)
        .bind(evaluated_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Fetch one learner's grade records for one program, ordered by evaluation
/// date then insertion. That ordering fixes both the competency grouping
/// order and the trend window downstream.
pub async fn fetch_records(
    pool: &PgPool,
    email: &str,
    program: &str,
) -> anyhow::Result<Vec<GradeRecord>> {
    let rows = sqlx::query(
        "SELECT l.id as learner_id, l.full_name, l.email, \
         g.program, g.competency, g.activity, g.score, g.max_score, \
         g.weight, g.observation, g.evaluated_at \
         FROM learner_performance.grade_records g \
         JOIN learner_performance.learners l ON l.id = g.learner_id \
         WHERE l.email = $1 AND g.program = $2 \
         ORDER BY g.evaluated_at, g.id",
    )
    .bind(email)
    .bind(program)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(GradeRecord {
            learner_id: row.get("learner_id"),
            learner_name: row.get("full_name"),
            learner_email: row.get("email"),
            program: row.get("program"),
            competency: row.get("competency"),
            activity: row.get("activity"),
            score: row.get("score"),
            max_score: row.get("max_score"),
            weight: row.get("weight"),
            observation: row.get("observation"),
            evaluated_at: row.get("evaluated_at"),
        });
    }

    Ok(records)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        program: String,
        competency: String,
        activity: String,
        score: f64,
        max_score: f64,
        weight: f64,
        observation: Option<String>,
        evaluated_at: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let learner_id: Uuid = sqlx::query(
            r#"
            INSERT INTO learner_performance.learners (id, full_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .fetch_one(pool)
        .await?
        .get("id");

        let record = GradeRecord {
            learner_id,
            learner_name: row.full_name,
            learner_email: row.email,
            program: row.program,
            competency: row.competency,
            activity: row.activity,
            score: row.score,
            max_score: row.max_score,
            weight: row.weight,
            observation: row.observation.unwrap_or_default(),
            evaluated_at: row.evaluated_at,
        };
        record
            .validate()
            .with_context(|| format!("rejected row {} of {}", line + 1, csv_path.display()))?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO learner_performance.grade_records
            (id, learner_id, program, competency, activity, score, max_score, weight, observation, evaluated_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.learner_id)
        .bind(&record.program)
        .bind(&record.competency)
        .bind(&record.activity)
        .bind(record.score)
        .bind(record.max_score)
        .bind(record.weight)
        .bind(&record.observation)
        .bind(record.evaluated_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
