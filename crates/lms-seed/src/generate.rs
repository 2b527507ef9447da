//! Random record generators.
//!
//! Every generator is pure: it draws from the given RNG and a fixed `now`, so
//! a seeded RNG reproduces the same data set.

use std::collections::HashMap;

use bson::DateTime;
use chrono::{DateTime as ChronoDateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use lms_core::{
    CourseId, EnrollmentStatus, LessonId, LessonType, Level, OrderStatus, ProgressStatus,
    RecordId, UserId,
};
use lms_store::{
    Course, CourseStats, Enrollment, Lesson, LessonContent, LessonStats, Order, Progress,
};

const COURSE_TITLES: &[&str] = &[
    "Introduction to JavaScript",
    "Advanced Node.js Development",
    "MongoDB for Beginners",
    "Express.js Framework Guide",
    "React Frontend Development",
    "Vue.js Complete Course",
    "Angular Application Building",
    "Python for Data Science",
    "Machine Learning Basics",
    "Deep Learning with TensorFlow",
    "CSS Styling Techniques",
    "HTML Fundamentals",
    "Database Design Principles",
    "RESTful API Development",
    "GraphQL Implementation",
    "Docker Containerization",
    "Kubernetes Orchestration",
    "AWS Cloud Services",
    "Cybersecurity Fundamentals",
    "Mobile App Development",
    "DevOps Practices",
    "Git Version Control",
    "Agile Project Management",
    "UI/UX Design Principles",
    "Software Testing Methods",
];

const LANGUAGES: &[&str] = &["vi", "en", "fr", "es", "de"];

/// Tags a generated course draws from.
pub const TAG_POOL: &[&str] = &[
    "javascript", "node", "mongodb", "express", "react", "vue", "angular", "python", "ml", "dl",
    "css", "html", "db", "rest", "graphql", "docker", "k8s", "aws", "security", "mobile", "devops",
    "git", "agile", "uiux", "testing",
];

const LESSON_TITLES: &[&str] = &[
    "Introduction and Overview",
    "Setting Up Development Environment",
    "Basic Concepts and Fundamentals",
    "Core Features Deep Dive",
    "Advanced Techniques",
    "Best Practices and Patterns",
    "Common Pitfalls and Solutions",
    "Performance Optimization",
    "Security Considerations",
    "Testing Strategies",
    "Deployment and Production",
    "Maintenance and Updates",
    "Real-world Examples",
    "Case Study Analysis",
    "Hands-on Practice",
    "Code Review Session",
    "Q&A and Discussion",
    "Project Walkthrough",
    "Troubleshooting Guide",
    "Next Steps and Resources",
];

const LESSON_TEXT: &[&str] = &[
    "This lesson covers the fundamental concepts and provides a solid foundation for understanding the topic.",
    "Learn about the key principles and how they apply in real-world scenarios.",
    "Explore advanced techniques and methodologies used by industry professionals.",
    "Understand the best practices and common patterns used in modern development.",
    "Discover how to avoid common mistakes and implement robust solutions.",
    "Master the art of optimization and performance tuning for better results.",
    "Learn about security considerations and how to protect your applications.",
    "Understand testing methodologies and how to ensure code quality.",
    "Explore deployment strategies and production environment management.",
    "Learn about maintenance practices and keeping your systems up-to-date.",
];

const VIDEO_IDS: &[&str] = &[
    "dQw4w9WgXcQ",
    "jNQXAC9IVRw",
    "M7lc1UVf-VE",
    "fJ9rUzIMcZQ",
    "kJQP7kiw5Fk",
];

/// Highest generated course price.
pub const MAX_COURSE_PRICE: u32 = 200_000;

/// Lowest generated order amount.
pub const MIN_ORDER_AMOUNT: u32 = 100_000;

/// Span of generated order amounts above the minimum.
pub const ORDER_AMOUNT_SPAN: u32 = 2_000_000;

/// Longest generated study time of one progress entry, in seconds.
pub const MAX_PROGRESS_SECONDS: i64 = 3600;

/// A uniformly random instant in the `days` days before `now`.
fn within_days<R: Rng>(rng: &mut R, now: ChronoDateTime<Utc>, days: i64) -> DateTime {
    let span = Duration::days(days).num_milliseconds();
    let back = rng.gen_range(0..=span);
    DateTime::from_chrono(now - Duration::milliseconds(back))
}

/// `now` minus a whole number of days below `days`.
fn days_ago<R: Rng>(rng: &mut R, now: ChronoDateTime<Utc>, days: i64) -> DateTime {
    DateTime::from_chrono(now - Duration::days(rng.gen_range(0..days)))
}

fn pick<'a, R: Rng>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// Lower-case, dash-separated form of a title keeping only word characters.
#[must_use]
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Generate `count` courses.
///
/// Prices are whole thousands up to [`MAX_COURSE_PRICE`], each course gets one
/// to four distinct tags, and about 15% are unpublished. Slugs carry `now` and
/// the position so titles may repeat.
pub fn courses<R: Rng>(rng: &mut R, count: usize, now: ChronoDateTime<Utc>) -> Vec<Course> {
    let suffix = now.timestamp_millis();
    (0..count)
        .map(|i| {
            let title = pick(rng, COURSE_TITLES);
            let tag_count = rng.gen_range(1..=4);
            let tags = TAG_POOL
                .choose_multiple(rng, tag_count)
                .map(ToString::to_string)
                .collect();
            let published_at = rng
                .gen_bool(0.85)
                .then(|| within_days(rng, now, 730));

            Course {
                id: CourseId::generate(),
                title: title.to_string(),
                slug: format!("{}-{suffix}-{i}", slugify(title)),
                lang: pick(rng, LANGUAGES).to_string(),
                price: f64::from(rng.gen_range(0..=MAX_COURSE_PRICE / 1000) * 1000),
                level: Level::ALL.choose(rng).copied(),
                tags,
                published_at,
                stats: CourseStats {
                    lesson_count: rng.gen_range(1..=50),
                    enrolled: rng.gen_range(0..1000),
                },
                created_at: Some(DateTime::from_chrono(now)),
            }
        })
        .collect()
}

fn lesson_content<R: Rng>(rng: &mut R, lesson_type: LessonType, index: usize) -> LessonContent {
    let is_video = lesson_type == LessonType::Video;
    LessonContent {
        video_url: is_video
            .then(|| format!("https://www.youtube.com/watch?v={}", pick(rng, VIDEO_IDS))),
        duration: is_video.then(|| rng.gen_range(5..60) * 60),
        transcript: is_video.then(|| pick(rng, LESSON_TEXT).to_string()),
        description: Some(pick(rng, LESSON_TEXT).to_string()),
        attachments: if rng.gen_bool(0.3) {
            vec![format!("attachment-{index}.pdf")]
        } else {
            Vec::new()
        },
    }
}

/// Generate five to nineteen ordered lessons for each course.
///
/// About 80% are published and 30% free; only video lessons carry a video
/// url, duration and transcript.
pub fn lessons<R: Rng>(
    rng: &mut R,
    course_ids: &[CourseId],
    now: ChronoDateTime<Utc>,
) -> Vec<Lesson> {
    let suffix = now.timestamp_millis();
    let mut lessons = Vec::new();

    for &course_id in course_ids {
        let count = rng.gen_range(5..20);
        for i in 0..count {
            let title = pick(rng, LESSON_TITLES);
            let lesson_type = LessonType::ALL
                .choose(rng)
                .copied()
                .unwrap_or_default();
            let is_published = rng.gen_bool(0.8);
            let is_free = rng.gen_bool(0.3);

            lessons.push(Lesson {
                id: LessonId::generate(),
                title: format!("{title} - Part {}", i + 1),
                slug: format!("{}-{course_id}-{i}-{suffix}", slugify(title)),
                course_id,
                order: i64::try_from(i + 1).unwrap_or(i64::MAX),
                lesson_type,
                content: lesson_content(rng, lesson_type, i),
                is_free,
                is_published,
                published_at: is_published.then(|| within_days(rng, now, 730)),
                stats: LessonStats {
                    views: rng.gen_range(0..1000),
                    completions: rng.gen_range(0..500),
                },
                created_at: Some(DateTime::from_chrono(now)),
            });
        }
    }

    lessons
}

/// Number of lessons generated per course.
#[must_use]
pub fn lesson_counts(lessons: &[Lesson]) -> HashMap<CourseId, i64> {
    let mut counts = HashMap::new();
    for lesson in lessons {
        *counts.entry(lesson.course_id).or_insert(0) += 1;
    }
    counts
}

/// Generate enrollments for `users` fresh users.
///
/// Each user enrolls in one to three distinct courses within the last year;
/// about 90% of enrollments are active, the rest refunded.
pub fn enrollments<R: Rng>(
    rng: &mut R,
    course_ids: &[CourseId],
    users: usize,
    now: ChronoDateTime<Utc>,
) -> Vec<Enrollment> {
    let mut enrollments = Vec::new();

    for _ in 0..users {
        let user_id = UserId::generate();
        let count = rng.gen_range(1..=3).min(course_ids.len());
        let picked: Vec<CourseId> = course_ids.choose_multiple(rng, count).copied().collect();

        for course_id in picked {
            let status = if rng.gen_bool(0.9) {
                EnrollmentStatus::Active
            } else {
                EnrollmentStatus::Refund
            };
            enrollments.push(Enrollment {
                id: RecordId::generate(),
                user_id,
                course_id,
                enrolled_at: days_ago(rng, now, 365),
                status,
            });
        }
    }

    enrollments
}

/// Generate one or two orders for each of `users` fresh users.
///
/// Amounts fall in `[MIN_ORDER_AMOUNT, MIN_ORDER_AMOUNT + ORDER_AMOUNT_SPAN)`;
/// about 90% are paid, the rest refunded.
pub fn orders<R: Rng>(
    rng: &mut R,
    course_ids: &[CourseId],
    users: usize,
    now: ChronoDateTime<Utc>,
) -> Vec<Order> {
    let mut orders = Vec::new();
    if course_ids.is_empty() {
        return orders;
    }

    for _ in 0..users {
        let user_id = UserId::generate();
        for _ in 0..rng.gen_range(1..=2) {
            let Some(&course_id) = course_ids.choose(rng) else {
                continue;
            };
            let status = if rng.gen_bool(0.9) {
                OrderStatus::Paid
            } else {
                OrderStatus::Refunded
            };
            orders.push(Order {
                id: RecordId::generate(),
                user_id,
                course_id,
                amount: f64::from(MIN_ORDER_AMOUNT + rng.gen_range(0..ORDER_AMOUNT_SPAN)),
                status,
                paid_at: days_ago(rng, now, 365),
            });
        }
    }

    orders
}

/// Generate five to twenty progress entries per enrollment.
///
/// Entries point at the course's lessons in order when the course has any,
/// otherwise at fresh lesson ids. About 80% are done.
pub fn progress<R: Rng>(
    rng: &mut R,
    enrollments: &[Enrollment],
    lessons: &[Lesson],
    now: ChronoDateTime<Utc>,
) -> Vec<Progress> {
    let mut by_course: HashMap<CourseId, Vec<LessonId>> = HashMap::new();
    for lesson in lessons {
        by_course.entry(lesson.course_id).or_default().push(lesson.id);
    }

    let mut entries = Vec::new();
    for enrollment in enrollments {
        let course_lessons = by_course
            .get(&enrollment.course_id)
            .map_or(&[][..], Vec::as_slice);
        let count = rng.gen_range(5..=20);

        for i in 0..count {
            let lesson_id = if course_lessons.is_empty() {
                LessonId::generate()
            } else {
                course_lessons[i % course_lessons.len()]
            };
            let status = if rng.gen_bool(0.8) {
                ProgressStatus::Done
            } else {
                ProgressStatus::Incomplete
            };
            entries.push(Progress {
                id: RecordId::generate(),
                user_id: enrollment.user_id,
                course_id: enrollment.course_id,
                lesson_id,
                status,
                duration_sec: rng.gen_range(0..MAX_PROGRESS_SECONDS),
                updated_at: days_ago(rng, now, 30),
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn slugify_keeps_word_characters() {
        assert_eq!(slugify("UI/UX Design Principles"), "uiux-design-principles");
        assert_eq!(slugify("Q&A and  Discussion"), "qa-and-discussion");
        assert_eq!(slugify("Express.js Framework Guide"), "expressjs-framework-guide");
    }

    #[test]
    fn courses_stay_in_range() {
        let now = Utc::now();
        let courses = courses(&mut rng(), 200, now);
        assert_eq!(courses.len(), 200);

        let slugs: HashSet<_> = courses.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs.len(), 200);

        let oldest = DateTime::from_chrono(now - Duration::days(730));
        for course in &courses {
            assert!((0.0..=f64::from(MAX_COURSE_PRICE)).contains(&course.price));
            assert_eq!(course.price % 1000.0, 0.0);
            assert!((1..=4).contains(&course.tags.len()));
            let distinct: HashSet<_> = course.tags.iter().collect();
            assert_eq!(distinct.len(), course.tags.len());
            assert!(course.tags.iter().all(|t| TAG_POOL.contains(&t.as_str())));
            if let Some(at) = course.published_at {
                assert!(at >= oldest);
            }
        }
        assert!(courses.iter().any(|c| c.published_at.is_none()));
    }

    #[test]
    fn lessons_are_ordered_per_course() {
        let ids = [CourseId::generate(), CourseId::generate()];
        let lessons = lessons(&mut rng(), &ids, Utc::now());
        let counts = lesson_counts(&lessons);

        for id in ids {
            let count = counts[&id];
            assert!((5..20).contains(&count));
            let orders: Vec<_> = lessons
                .iter()
                .filter(|l| l.course_id == id)
                .map(|l| l.order)
                .collect();
            assert_eq!(orders, (1..=count).collect::<Vec<_>>());
        }
    }

    #[test]
    fn only_video_lessons_carry_video_fields() {
        let lessons = lessons(&mut rng(), &[CourseId::generate(); 5], Utc::now());
        for lesson in &lessons {
            let is_video = lesson.lesson_type == LessonType::Video;
            assert_eq!(lesson.content.video_url.is_some(), is_video);
            assert_eq!(lesson.content.duration.is_some(), is_video);
            assert!(lesson.content.description.is_some());
            assert_eq!(lesson.published_at.is_some(), lesson.is_published);
        }
    }

    #[test]
    fn enrollments_use_distinct_courses_per_user() {
        let ids: Vec<_> = (0..5).map(|_| CourseId::generate()).collect();
        let enrollments = enrollments(&mut rng(), &ids, 20, Utc::now());

        let users: HashSet<_> = enrollments.iter().map(|e| e.user_id).collect();
        assert_eq!(users.len(), 20);
        for user in users {
            let courses: Vec<_> = enrollments
                .iter()
                .filter(|e| e.user_id == user)
                .map(|e| e.course_id)
                .collect();
            assert!((1..=3).contains(&courses.len()));
            let distinct: HashSet<_> = courses.iter().collect();
            assert_eq!(distinct.len(), courses.len());
        }
    }

    #[test]
    fn single_course_caps_enrollments() {
        let id = CourseId::generate();
        let enrollments = enrollments(&mut rng(), &[id], 10, Utc::now());
        assert_eq!(enrollments.len(), 10);
    }

    #[test]
    fn orders_stay_in_range() {
        let ids = [CourseId::generate()];
        let orders = orders(&mut rng(), &ids, 20, Utc::now());
        assert!((20..=40).contains(&orders.len()));
        for order in &orders {
            assert!(order.amount >= f64::from(MIN_ORDER_AMOUNT));
            assert!(order.amount < f64::from(MIN_ORDER_AMOUNT + ORDER_AMOUNT_SPAN));
        }
        assert!(super::orders(&mut rng(), &[], 20, Utc::now()).is_empty());
    }

    #[test]
    fn progress_follows_enrollments() {
        let now = Utc::now();
        let course_id = CourseId::generate();
        let lessons = lessons(&mut rng(), &[course_id], now);
        let enrollments = enrollments(&mut rng(), &[course_id], 3, now);
        let entries = progress(&mut rng(), &enrollments, &lessons, now);

        let lesson_ids: HashSet<_> = lessons.iter().map(|l| l.id).collect();
        let oldest = DateTime::from_chrono(now - Duration::days(30));
        for entry in &entries {
            assert_eq!(entry.course_id, course_id);
            assert!(lesson_ids.contains(&entry.lesson_id));
            assert!((0..MAX_PROGRESS_SECONDS).contains(&entry.duration_sec));
            assert!(entry.updated_at >= oldest);
        }
        for enrollment in &enrollments {
            let count = entries
                .iter()
                .filter(|p| p.user_id == enrollment.user_id)
                .count();
            assert!((5..=20).contains(&count));
        }
    }

    #[test]
    fn same_seed_same_shape() {
        let now = Utc::now();
        let a = courses(&mut rng(), 10, now);
        let b = courses(&mut rng(), 10, now);
        let prices = |cs: &[Course]| cs.iter().map(|c| c.price).collect::<Vec<_>>();
        assert_eq!(prices(&a), prices(&b));
    }
}
