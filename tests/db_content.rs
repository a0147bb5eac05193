use asksniff::{
    application::repos::{CategoryParams, ContentRepo, ContentWriteRepo, SubHeadingParams},
    domain::{entities::SubHeadingRecord, types::AgeGroup},
    infra::db::PostgresRepositories,
};
use sqlx::PgPool;
use time::OffsetDateTime;

async fn seed_sub_heading(
    repo: &PostgresRepositories,
    symptom: &str,
    title: &str,
    text: &str,
    age_groups: Vec<AgeGroup>,
) -> SubHeadingRecord {
    let category = match repo.find_category_by_name(symptom).await.expect("find") {
        Some(category) => category,
        None => repo
            .create_category(CategoryParams {
                name: symptom.into(),
                description: format!("<p>About {symptom}.</p>"),
            })
            .await
            .expect("create category"),
    };
    let heading = repo
        .create_heading(category.id, "What to do")
        .await
        .expect("create heading");
    repo.create_sub_heading(SubHeadingParams {
        heading_id: heading.id,
        title: title.into(),
        text: text.into(),
        age_groups,
        edited_at: OffsetDateTime::UNIX_EPOCH,
    })
    .await
    .expect("create sub-heading")
}

fn ids(records: &[SubHeadingRecord]) -> Vec<i64> {
    records.iter().map(|record| record.id).collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn search_treats_like_wildcards_literally(pool: PgPool) {
    let repo = PostgresRepositories::new(pool);
    let group = AgeGroup::TwoToFiveYears;
    let percent = seed_sub_heading(&repo, "rash", "Up to 50% of children", "", vec![group]).await;
    let underscore = seed_sub_heading(&repo, "rash", "Use a_b cream", "", vec![group]).await;
    let decoy = seed_sub_heading(&repo, "rash", "Up to 500 spots", "aXb", vec![group]).await;

    let hits = repo.search_sub_headings("50%", group).await.expect("search");
    assert_eq!(ids(&hits), vec![percent.id]);

    let hits = repo.search_sub_headings("a_b", group).await.expect("search");
    assert_eq!(ids(&hits), vec![underscore.id]);

    let hits = repo.search_sub_headings("%", group).await.expect("search");
    assert_eq!(ids(&hits), vec![percent.id]);
    assert!(!ids(&hits).contains(&decoy.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn search_matches_every_field_once_within_the_age_group(pool: PgPool) {
    let repo = PostgresRepositories::new(pool);
    let infant = seed_sub_heading(
        &repo,
        "high_temperature",
        "Fever in babies",
        "<p>A fever needs a doctor.</p>",
        vec![AgeGroup::UnderOneMonth, AgeGroup::OneToThreeMonths],
    )
    .await;
    let toddler = seed_sub_heading(
        &repo,
        "high_temperature",
        "Fluids",
        "<p>Keep them drinking.</p>",
        vec![AgeGroup::TwoToFiveYears],
    )
    .await;

    // Title and text both match; the row appears once.
    let hits = repo
        .search_sub_headings("FEVER", AgeGroup::UnderOneMonth)
        .await
        .expect("search");
    assert_eq!(ids(&hits), vec![infant.id]);

    // Symptom name and description reach every sub-heading of the symptom.
    let hits = repo
        .search_sub_headings("temperature", AgeGroup::TwoToFiveYears)
        .await
        .expect("search");
    assert_eq!(ids(&hits), vec![toddler.id]);

    let hits = repo
        .search_sub_headings("what to", AgeGroup::UnderOneMonth)
        .await
        .expect("search");
    assert_eq!(ids(&hits), vec![infant.id]);

    let hits = repo
        .search_sub_headings("fever", AgeGroup::SixToTwelveMonths)
        .await
        .expect("search");
    assert!(hits.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn visible_sub_headings_follow_age_membership(pool: PgPool) {
    let repo = PostgresRepositories::new(pool);
    let shared = seed_sub_heading(
        &repo,
        "cough",
        "Honey",
        "",
        vec![AgeGroup::TwelveToTwentyFourMonths, AgeGroup::TwoToFiveYears],
    )
    .await;

    let visible = repo
        .list_visible_sub_headings(shared.heading_id, AgeGroup::TwoToFiveYears)
        .await
        .expect("list");
    assert_eq!(ids(&visible), vec![shared.id]);
    assert_eq!(
        visible[0].age_groups,
        vec![AgeGroup::TwelveToTwentyFourMonths, AgeGroup::TwoToFiveYears]
    );

    let hidden = repo
        .list_visible_sub_headings(shared.heading_id, AgeGroup::UnderOneMonth)
        .await
        .expect("list");
    assert!(hidden.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_symptom_cascades_to_its_content(pool: PgPool) {
    let repo = PostgresRepositories::new(pool.clone());
    let doomed = seed_sub_heading(&repo, "rash", "Spots", "", vec![AgeGroup::UnderOneMonth]).await;
    let kept = seed_sub_heading(&repo, "cough", "Honey", "", vec![AgeGroup::UnderOneMonth]).await;
    let heading = repo
        .find_heading(doomed.heading_id)
        .await
        .expect("find heading")
        .expect("heading exists");

    assert!(repo.delete_category(heading.category_id).await.expect("delete"));

    assert!(repo.find_heading(heading.id).await.expect("find").is_none());
    assert!(repo.find_sub_heading(doomed.id).await.expect("find").is_none());
    assert!(repo.find_sub_heading(kept.id).await.expect("find").is_some());
    assert!(!repo.delete_category(heading.category_id).await.expect("delete"));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM headings")
        .fetch_one(&pool)
        .await
        .expect("count headings");
    assert_eq!(remaining, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn schema_rejects_unknown_age_codes(pool: PgPool) {
    let repo = PostgresRepositories::new(pool.clone());
    let existing = seed_sub_heading(&repo, "rash", "Spots", "", vec![AgeGroup::UnderOneMonth]).await;

    let result = sqlx::query(
        "INSERT INTO sub_headings (heading_id, title, age_groups) VALUES ($1, 'Bad', ARRAY[9]::SMALLINT[])",
    )
    .bind(existing.heading_id)
    .execute(&pool)
    .await;
    assert!(result.is_err());

    let empty = sqlx::query(
        "INSERT INTO sub_headings (heading_id, title, age_groups) VALUES ($1, 'Bad', '{}')",
    )
    .bind(existing.heading_id)
    .execute(&pool)
    .await;
    assert!(empty.is_err());
}
