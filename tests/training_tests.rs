//! End-to-end training behavior for the single-RBM trainers:
//! - CD-1 drives reconstruction error down on the classic 6-pattern fixture
//! - sampled states are strictly binary
//! - day-dreaming walks the visible space without leaving it
//! - supervised fine-tuning separates a small labeled mapping
//! - the recurrent trainer predicts the next event in a short cycle

use rbm::{
    BackErrorPropagation, ContrastiveDivergence, ImmutableMatrix, LearningParameters, Matrix,
    MutableMatrix, RandomRbmFactory, RecurrentContrastiveDivergence, UnaryFunction,
};

/// Two clusters of overlapping binary patterns; the classic pick-3-of-6
/// fixture for tiny RBM demos.
fn six_pattern_fixture<M: Matrix>() -> M {
    M::from_rows(&[
        vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
    ])
    .unwrap()
}

fn params(epochs: usize) -> LearningParameters {
    LearningParameters::default()
        .with_epochs(epochs)
        .with_log(false)
}

#[test]
fn cd_reduces_reconstruction_error_on_fixture() {
    let mut factory = RandomRbmFactory::seeded(101);
    let mut rbm = factory.build::<ImmutableMatrix>(6, 3);
    let data = six_pattern_fixture::<ImmutableMatrix>();
    let mut cd = ContrastiveDivergence::with_seed(params(5000), 7);

    let before = cd.reconstruction_error(&rbm, &data).unwrap();
    let after = cd.learn(&mut rbm, &data).unwrap();

    assert!(
        after < before,
        "reconstruction error should drop: {} -> {}",
        before,
        after
    );
    // Untrained reconstruction hovers around a quarter squared error per
    // entry (9.0 over this 6x6 fixture); trained should be well below.
    assert!(after < 7.0, "error still high after training: {}", after);
}

#[test]
fn inference_round_trip_keeps_shapes_and_binary_states() {
    let mut factory = RandomRbmFactory::seeded(101);
    let mut rbm = factory.build::<MutableMatrix>(6, 3);
    let data = six_pattern_fixture::<MutableMatrix>();
    let mut cd = ContrastiveDivergence::with_seed(params(1500), 7);
    cd.learn(&mut rbm, &data).unwrap();

    let probe = MutableMatrix::from_rows(&[
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
    ])
    .unwrap();

    let hidden = cd.run_visible(&rbm, &probe).unwrap();
    assert_eq!((hidden.rows(), hidden.cols()), (2, 3));
    let visible = cd.run_hidden(&rbm, &hidden).unwrap();
    assert_eq!((visible.rows(), visible.cols()), (2, 6));

    for m in [&hidden, &visible] {
        assert!(m.as_array().iter().all(|&v| v == 0.0 || v == 1.0));
    }
}

#[test]
fn day_dream_stays_in_the_visible_space() {
    let mut factory = RandomRbmFactory::seeded(33);
    let mut rbm = factory.build::<ImmutableMatrix>(6, 4);
    let data = six_pattern_fixture::<ImmutableMatrix>();
    let mut cd = ContrastiveDivergence::with_seed(params(1000), 13);
    cd.learn(&mut rbm, &data).unwrap();

    let dreams = cd.day_dream(&rbm, &data, 12).unwrap();
    assert_eq!(dreams.len(), 12);
    for dream in &dreams {
        assert_eq!((dream.rows(), dream.cols()), (6, 6));
    }
    // Everything after the seed is a sampled binary state.
    for dream in &dreams[1..] {
        assert!(dream.as_array().iter().all(|&v| v == 0.0 || v == 1.0));
    }
}

#[test]
fn backprop_separates_labeled_patterns() {
    let mut factory = RandomRbmFactory::seeded(55);
    let mut rbm = factory.build::<ImmutableMatrix>(6, 2);

    let data = six_pattern_fixture::<ImmutableMatrix>();
    let inputs: Vec<ImmutableMatrix> = (0..6)
        .map(|i| ImmutableMatrix::from_rows(&[data.row(i)]).unwrap())
        .collect();
    // First three patterns are class 0, the rest class 1.
    let teachers: Vec<ImmutableMatrix> = (0..6)
        .map(|i| {
            let label = if i < 3 {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            };
            ImmutableMatrix::from_rows(&[label]).unwrap()
        })
        .collect();

    let trainer = BackErrorPropagation::new(params(2000).with_learning_rate(0.5));
    trainer.learn(&mut rbm, &inputs, &teachers).unwrap();

    for (i, input) in inputs.iter().enumerate() {
        let out = trainer.feed_forward(&rbm, input).unwrap();
        let predicted = if out.get(0, 0) > out.get(0, 1) { 0 } else { 1 };
        let expected = usize::from(i >= 3);
        assert_eq!(predicted, expected, "pattern {} misclassified: {:?}", i, out);
    }
}

#[test]
fn recurrent_trainer_predicts_next_event_in_a_cycle() {
    // Three one-hot events cycling 0 -> 1 -> 2 -> 0. With memory 1 the
    // model learns (current, next) jointly, so feeding an event with a
    // blank future should reconstruct its successor in the window block.
    let events: Vec<ImmutableMatrix> = (0..3)
        .map(|i| {
            let mut row = vec![0.0; 3];
            row[i] = 1.0;
            ImmutableMatrix::from_rows(&[row]).unwrap()
        })
        .collect();
    // Repeat the cycle so the zero-padded tail window is a small fraction
    // of what the model sees, and (event 0 -> event 1) is never shadowed by
    // an (event 0, blank) training window.
    let mut sequence = Vec::new();
    for _ in 0..3 {
        sequence.extend(events.iter().cloned());
    }

    let mut factory = RandomRbmFactory::seeded(21);
    let mut rbm = factory.build::<ImmutableMatrix>(6, 24);
    let mut trainer = RecurrentContrastiveDivergence::with_seed(
        params(3000).with_learning_rate(0.75).with_memory(1),
        17,
    );
    trainer.learn(&mut rbm, &sequence).unwrap();

    // Majority vote over repeated stochastic reconstructions; the window
    // block (columns 3..6) holds the model's guess of what comes next.
    let mut next_votes = [0.0f64; 3];
    for _ in 0..40 {
        let hidden = trainer.run_visible(&rbm, &events[0]).unwrap();
        let visible = trainer.run_hidden(&rbm, &hidden).unwrap();
        for j in 0..3 {
            next_votes[j] += visible.get(0, 3 + j);
        }
    }
    // Event 2 never follows event 0 in the sequence; event 1 always does.
    assert!(
        next_votes[1] > next_votes[2],
        "expected event 1, not event 2, to follow event 0: {:?}",
        next_votes
    );
}

#[test]
fn pluggable_logistic_function_is_honored() {
    // A ranged sigmoid keeps probabilities inside [0.25, 0.75], so sampled
    // thresholds can land on either side; the training loop must still run.
    let mut factory = RandomRbmFactory::seeded(3);
    let mut rbm = factory.build::<ImmutableMatrix>(6, 3);
    let data = six_pattern_fixture::<ImmutableMatrix>();
    let mut cd = ContrastiveDivergence::with_seed(
        params(50).with_logistic(UnaryFunction::RangedSigmoid {
            min: 0.25,
            max: 0.75,
        }),
        5,
    );
    let error = cd.learn(&mut rbm, &data).unwrap();
    assert!(error.is_finite());
}
