// src/storage/seed.rs

use super::{Storage, StorageError};
use crate::models::{
    course::CreateCourseRequest,
    mock_test::{CreateMockTestRequest, Difficulty},
    question::CreateQuestionRequest,
};

const COURSE_IMAGES: [&str; 4] = [
    "https://images.unsplash.com/photo-1472289065668-ce650ac443d2",
    "https://images.unsplash.com/photo-1493723843671-1d655e66ac1c",
    "https://images.unsplash.com/photo-1557804483-ef3ae78eca57",
    "https://images.unsplash.com/photo-1517048676732-d65bc937f952",
];

/// (prompt, options, correct index, explanation)
const SAMPLE_QUESTIONS: [(&str, [&str; 4], usize, &str); 5] = [
    ("What is 12 x 12?", ["124", "144", "132", "156"], 1, "12 x 12 = 144."),
    (
        "Which planet is closest to the Sun?",
        ["Venus", "Earth", "Mercury", "Mars"],
        2,
        "Mercury orbits closest to the Sun.",
    ),
    (
        "What is the boiling point of water at sea level?",
        ["100 °C", "90 °C", "120 °C", "80 °C"],
        0,
        "Water boils at 100 °C at one atmosphere.",
    ),
    (
        "Which word is a synonym of 'rapid'?",
        ["Slow", "Quick", "Heavy", "Quiet"],
        1,
        "'Rapid' and 'quick' both mean fast.",
    ),
    (
        "How many sides does a hexagon have?",
        ["5", "8", "7", "6"],
        3,
        "A hexagon has six sides.",
    ),
];

/// Inserts the sample catalog when no courses exist yet.
/// Returns `true` when anything was written.
pub async fn seed_demo_catalog(storage: &Storage) -> Result<bool, StorageError> {
    if !storage.courses.list_courses().await?.is_empty() {
        return Ok(false);
    }

    for (index, image_url) in COURSE_IMAGES.iter().enumerate() {
        let req = CreateCourseRequest {
            title: format!("Sample Course {}", index + 1),
            description: "A guided program covering the fundamentals step by step, \
                          with exercises at the end of every module."
                .to_string(),
            image_url: image_url.to_string(),
            duration: "10 weeks".to_string(),
            price: 99,
            featured: index == 0,
        };
        storage.courses.create_course(None, &req).await?;
    }

    let test = storage
        .mock_tests
        .create_test(
            None,
            &CreateMockTestRequest {
                title: "General Aptitude".to_string(),
                description: "A short mixed quiz: arithmetic, science and vocabulary.".to_string(),
                duration_minutes: 10,
                total_questions: SAMPLE_QUESTIONS.len() as i32,
                difficulty: Difficulty::Beginner,
                image_url: "https://images.unsplash.com/photo-1434030216411-0b793f4b4173"
                    .to_string(),
                featured: true,
            },
        )
        .await?;

    for (text, options, correct_option, explanation) in SAMPLE_QUESTIONS {
        let req = CreateQuestionRequest {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_option,
            explanation: explanation.to_string(),
        };
        storage.mock_tests.create_question(test.id, &req).await?;
    }

    tracing::info!("Seeded demo catalog ({} courses, mock test {})", COURSE_IMAGES.len(), test.id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_once() {
        let storage = Storage::in_memory();

        assert!(seed_demo_catalog(&storage).await.unwrap());
        assert!(!seed_demo_catalog(&storage).await.unwrap());

        let courses = storage.courses.list_courses().await.unwrap();
        assert_eq!(courses.len(), 4);
        assert_eq!(courses.iter().filter(|c| c.featured).count(), 1);

        let tests = storage.mock_tests.list_tests().await.unwrap();
        assert_eq!(tests.len(), 1);
        let questions = storage.mock_tests.get_questions(tests[0].id).await.unwrap();
        assert_eq!(questions.len() as i32, tests[0].total_questions);
        assert!(questions.iter().all(|q| q.correct_option < q.options.len()));
    }
}
