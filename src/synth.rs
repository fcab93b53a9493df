//! Synthetic healthcare reviews
//!
//! A small seeded generator that expands fixed base reviews with random
//! prefixes and suffixes, plus the fixed review sets used for augmentation
//! and demos.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::sentiment::{Review, Sentiment};

pub const DEFAULT_COUNT: usize = 500;

const VARIATIONS_PER_REVIEW: usize = 3;

const PREFIXES: [&str; 4] = ["Overall, ", "In my experience, ", "I found that ", ""];

const SUFFIXES: [&str; 5] = [" today.", " recently.", " last week.", " during my visit.", ""];

pub const POSITIVE_BASE: [&str; 15] = [
    "The doctor was very professional and caring during my visit",
    "Excellent service and quick appointment scheduling",
    "Staff was friendly and the facility was clean and modern",
    "Doctor took time to explain everything clearly",
    "Great experience with minimal wait time",
    "The treatment was effective and I felt much better",
    "Nurse was very gentle and understanding",
    "Outstanding medical care and follow-up",
    "Highly recommend this healthcare provider",
    "Professional staff and comfortable environment",
    "Doctor listened carefully to my concerns",
    "Efficient service with great results",
    "Clean facilities and modern equipment",
    "Caring medical team that goes above and beyond",
    "Quick diagnosis and effective treatment plan",
];

pub const NEGATIVE_BASE: [&str; 15] = [
    "Long wait times and poor communication from staff",
    "Doctor seemed rushed and didn't listen to my concerns",
    "Facility was outdated and not very clean",
    "Billing issues and unclear pricing information",
    "Rude receptionist and unprofessional behavior",
    "Appointment was cancelled at the last minute",
    "Doctor was dismissive of my symptoms",
    "Poor follow-up care and lack of communication",
    "Overpriced services with mediocre results",
    "Uncomfortable waiting room and long delays",
    "Staff seemed unorganized and confused",
    "Treatment didn't help and no alternative options given",
    "Difficulty getting appointments when needed",
    "Insurance problems not handled properly",
    "Felt like just another number, not a patient",
];

pub const NEUTRAL_BASE: [&str; 15] = [
    "Average experience, nothing particularly good or bad",
    "Standard medical care, met basic expectations",
    "Typical healthcare visit with routine procedures",
    "Service was okay, could be better or worse",
    "Normal appointment with expected results",
    "Standard facility with adequate services",
    "Regular check-up went as expected",
    "Basic care provided without any issues",
    "Acceptable service for the price paid",
    "Routine visit with no surprises",
    "Average wait time and standard procedures",
    "Typical medical office environment",
    "Standard appointment scheduling process",
    "Basic medical consultation provided",
    "Regular healthcare service delivery",
];

/// Short positive phrases appended to the training corpus so that terse
/// praise is not scored as neutral.
pub const SHORT_POSITIVE_EXAMPLES: &[&str] = &[
    "Great service",
    "Excellent care",
    "Amazing doctor",
    "Wonderful experience",
    "Best hospital",
    "Love this place",
    "Fantastic treatment",
    "Outstanding care",
    "Perfect experience",
    "Highly recommend",
    "Very satisfied",
    "Great experience",
    "Excellent service",
    "Amazing staff",
    "Wonderful care",
    "Best experience",
    "Love the staff",
    "Fantastic service",
    "I really enjoyed",
    "I really enjoyed the experience",
    "Great",
    "Excellent",
    "Amazing",
    "Wonderful",
    "Best",
    "Love it",
    "Fantastic",
    "Outstanding",
    "Perfect",
    "Highly recommend",
    "Very satisfied",
    "Great experience",
    "Excellent service",
    "Amazing staff",
    "Wonderful care",
    "Best experience",
    "Love the staff",
    "Fantastic service",
];

/// Served by the sample reviews endpoint.
pub const SAMPLE_REVIEWS: [&str; 10] = [
    "The doctor was very professional and caring. Great experience!",
    "Terrible service, long wait times and rude staff.",
    "The hospital was clean and the nurses were helpful.",
    "I had to wait for hours and the treatment was ineffective.",
    "The medical staff was knowledgeable and the facility was modern.",
    "Excellent care and attention to detail. Highly recommend!",
    "The medication worked perfectly for my condition.",
    "Average experience, nothing special but not bad either.",
    "The side effects were worse than the original problem.",
    "Outstanding medical care and professional staff.",
];

/// Longer unlabeled reviews for trying out batch scoring.
pub const SAMPLE_CSV_REVIEWS: [&str; 10] = [
    "The doctor was very professional and took time to explain my condition. The staff was friendly and the facility was clean.",
    "Long wait times and the receptionist was rude. The doctor seemed rushed and didn't answer my questions properly.",
    "The appointment was okay. The doctor was competent but not particularly warm. The facility is average.",
    "Excellent care! The nursing staff went above and beyond to make me comfortable. The doctor was knowledgeable and compassionate.",
    "Terrible experience. Had to wait 3 hours past my appointment time. The doctor was dismissive and didn't seem to care.",
    "The medical treatment was effective and the doctor was professional. The billing process was straightforward.",
    "Outstanding service from start to finish. The entire team was helpful and the treatment was successful.",
    "Poor communication and outdated facilities. The wait was unreasonable and the staff seemed overwhelmed.",
    "Standard healthcare experience. Nothing exceptional but the basic needs were met adequately.",
    "Amazing doctor who really listened to my concerns. The follow-up care was excellent and very thorough.",
];

fn base_reviews(sentiment: Sentiment) -> &'static [&'static str] {
    match sentiment {
        Sentiment::Positive => &POSITIVE_BASE,
        Sentiment::Negative => &NEGATIVE_BASE,
        Sentiment::Neutral => &NEUTRAL_BASE,
    }
}

/// Each base review followed by its reworded variations.
fn variations(base: &[&str], rng: &mut StdRng) -> Vec<String> {
    let mut pool = Vec::with_capacity(base.len() * (VARIATIONS_PER_REVIEW + 1));
    for review in base {
        pool.push(review.to_string());
        for _ in 0..VARIATIONS_PER_REVIEW {
            let prefix = PREFIXES.choose(rng).copied().unwrap_or_default();
            let suffix = SUFFIXES.choose(rng).copied().unwrap_or_default();
            pool.push(format!("{prefix}{}{suffix}", review.to_lowercase()));
        }
    }
    pool
}

/// Generates up to `count` labeled reviews split evenly across the three
/// classes (the remainder goes to positive, then negative), shuffled, with
/// duplicate texts removed.
pub fn generate(count: usize, seed: u64) -> Vec<Review> {
    let mut rng = StdRng::seed_from_u64(seed);
    let per_class = count / 3;
    let remainder = count % 3;
    let quotas = [
        (Sentiment::Positive, per_class + usize::from(remainder > 0)),
        (Sentiment::Negative, per_class + usize::from(remainder > 1)),
        (Sentiment::Neutral, per_class),
    ];

    let pools: Vec<(Sentiment, Vec<String>)> = quotas
        .iter()
        .map(|&(sentiment, _)| (sentiment, variations(base_reviews(sentiment), &mut rng)))
        .collect();

    let mut reviews = Vec::with_capacity(count);
    for (&(sentiment, quota), (_, pool)) in quotas.iter().zip(&pools) {
        for _ in 0..quota {
            if let Some(text) = pool.choose(&mut rng) {
                reviews.push(Review::new(text.clone(), sentiment));
            }
        }
    }
    reviews.shuffle(&mut rng);

    let mut seen = HashSet::new();
    reviews.retain(|review| seen.insert(review.text.clone()));
    reviews
}

/// The short positive phrases as labeled reviews.
pub fn short_positive_reviews() -> Vec<Review> {
    SHORT_POSITIVE_EXAMPLES
        .iter()
        .map(|text| Review::new(*text, Sentiment::Positive))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_seeded() {
        assert_eq!(generate(120, 7), generate(120, 7));
        assert_ne!(generate(120, 7), generate(120, 8));
    }

    #[test]
    fn generated_texts_are_unique_and_cover_every_class() {
        let reviews = generate(DEFAULT_COUNT, 42);
        assert!(!reviews.is_empty() && reviews.len() <= DEFAULT_COUNT);

        let unique: HashSet<_> = reviews.iter().map(|r| &r.text).collect();
        assert_eq!(unique.len(), reviews.len());

        for sentiment in Sentiment::ALL {
            assert!(reviews.iter().any(|r| r.sentiment == sentiment));
        }
    }

    #[test]
    fn variations_keep_the_base_review() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = variations(&POSITIVE_BASE[..1], &mut rng);
        assert_eq!(pool.len(), VARIATIONS_PER_REVIEW + 1);
        assert_eq!(pool[0], POSITIVE_BASE[0]);
        for varied in &pool[1..] {
            assert!(varied.contains("the doctor was very professional"));
        }
    }

    #[test]
    fn labels_follow_the_base_lists() {
        let negative: HashSet<String> = NEGATIVE_BASE.iter().map(|r| r.to_lowercase()).collect();
        for review in generate(90, 3) {
            let is_negative = negative.iter().any(|base| review.text.to_lowercase().contains(base));
            assert_eq!(is_negative, review.sentiment == Sentiment::Negative, "{}", review.text);
        }
    }

    #[test]
    fn short_examples_are_positive() {
        let reviews = short_positive_reviews();
        assert_eq!(reviews.len(), SHORT_POSITIVE_EXAMPLES.len());
        assert!(reviews.iter().all(|r| r.sentiment == Sentiment::Positive));
    }
}
