use serde::{Deserialize, Serialize};

/// BlazePose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    /// インデックス順の全ランドマーク
    pub const ALL: [LandmarkIndex; Self::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
            LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 左右を入れ替えたランドマーク (鼻はそのまま)
    pub fn mirror(self) -> Self {
        let i = self as usize;
        let mirrored = match i {
            0 => 0,
            1..=3 => i + 3,
            4..=6 => i - 3,
            // 7以降は (奇数=左, 偶数=右) のペア
            _ if i % 2 == 1 => i + 1,
            _ => i - 1,
        };
        Self::ALL[mirrored]
    }

    pub fn name(self) -> &'static str {
        use LandmarkIndex::*;
        match self {
            Nose => "nose",
            LeftEyeInner => "left_eye_inner",
            LeftEye => "left_eye",
            LeftEyeOuter => "left_eye_outer",
            RightEyeInner => "right_eye_inner",
            RightEye => "right_eye",
            RightEyeOuter => "right_eye_outer",
            LeftEar => "left_ear",
            RightEar => "right_ear",
            MouthLeft => "mouth_left",
            MouthRight => "mouth_right",
            LeftShoulder => "left_shoulder",
            RightShoulder => "right_shoulder",
            LeftElbow => "left_elbow",
            RightElbow => "right_elbow",
            LeftWrist => "left_wrist",
            RightWrist => "right_wrist",
            LeftPinky => "left_pinky",
            RightPinky => "right_pinky",
            LeftIndex => "left_index",
            RightIndex => "right_index",
            LeftThumb => "left_thumb",
            RightThumb => "right_thumb",
            LeftHip => "left_hip",
            RightHip => "right_hip",
            LeftKnee => "left_knee",
            RightKnee => "right_knee",
            LeftAnkle => "left_ankle",
            RightAnkle => "right_ankle",
            LeftHeel => "left_heel",
            RightHeel => "right_heel",
            LeftFootIndex => "left_foot_index",
            RightFootIndex => "right_foot_index",
        }
    }
}

impl std::fmt::Display for LandmarkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0、画像端では範囲外もありうる)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0、下が正)
    pub y: f32,
    /// 腰中点基準の相対深度 (角度計算では使わない)
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    /// visibility は [0, 1] に丸める。NaN は 0 扱い
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        let visibility = if visibility.is_nan() {
            0.0
        } else {
            visibility.clamp(0.0, 1.0)
        };
        Self { x, y, z, visibility }
    }

    /// 可視性が閾値以上か
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 1フレーム分のランドマーク。生成後は変更しない
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    index: u64,
    timestamp_ms: u64,
    landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl LandmarkFrame {
    pub fn new(index: u64, timestamp_ms: u64, landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self {
            index,
            timestamp_ms,
            landmarks,
        }
    }

    /// スライスから生成。要素数が 33 でなければ None
    pub fn from_slice(index: u64, timestamp_ms: u64, landmarks: &[Landmark]) -> Option<Self> {
        let landmarks: [Landmark; LandmarkIndex::COUNT] = landmarks.try_into().ok()?;
        Some(Self::new(index, timestamp_ms, landmarks))
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// インデックスでランドマークを取得
    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    pub fn landmarks(&self) -> &[Landmark; LandmarkIndex::COUNT] {
        &self.landmarks
    }

    /// 全ランドマークの平均可視性
    pub fn average_visibility(&self) -> f32 {
        let sum: f32 = self.landmarks.iter().map(|l| l.visibility).sum();
        sum / LandmarkIndex::COUNT as f32
    }

    /// 指定ランドマークがすべて閾値以上か
    pub fn all_visible(&self, indices: &[LandmarkIndex], threshold: f32) -> bool {
        indices.iter().all(|&i| self.get(i).is_visible(threshold))
    }
}
